//! Typed configuration sections
//!
//! The merged JSON value is deserialized into these structs once per run.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// `[server]`
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_key: Option<String>,
    pub url: String,
    pub timeout_seconds: u64,
}

impl ServerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Fail unless both credentials are present and non-empty.
    pub fn require_credentials(&self) -> Result<(), ConfigError> {
        let missing = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
        if missing(&self.api_key) {
            return Err(ConfigError::Invalid("server.api_key is not set".to_string()));
        }
        if missing(&self.application_key) {
            return Err(ConfigError::Invalid(
                "server.application_key is not set".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("ServerConfig")
            .field("api_key", &mask(&self.api_key))
            .field("application_key", &mask(&self.application_key))
            .field("url", &self.url)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// `[query]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryDefaults {
    /// Page size; zero or negative falls back to the built-in limit.
    pub limit: i64,
    pub range_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// `[tail]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TailConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub factor: f64,
    pub page_delay_ms: u64,
    pub dedup_capacity: usize,
    pub retry_transient_errors: bool,
}

impl TailConfig {
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

/// One `[fields]` value: a list, or a comma-separated string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldNames {
    List(Vec<String>),
    Csv(String),
}

impl FieldNames {
    pub fn into_vec(self) -> Vec<String> {
        let names = match self {
            FieldNames::List(names) => names,
            FieldNames::Csv(s) => s.split(',').map(str::to_string).collect(),
        };
        names
            .into_iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect()
    }
}

/// One `[[format]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormatDefinition {
    pub name: String,
    pub template: String,
}

impl FormatDefinition {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
        }
    }
}

/// The whole typed document.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SettingsDocument {
    pub server: ServerConfig,
    pub query: QueryDefaults,
    pub tail: TailConfig,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldNames>,
    #[serde(default)]
    pub format: Vec<FormatDefinition>,
}
