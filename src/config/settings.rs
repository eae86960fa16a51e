//! Effective settings with full provenance
//!
//! `Settings` captures the merged configuration, the typed sections derived
//! from it, and where each contributing layer came from. It is built once per
//! run and handed to the session by reference.

use std::fs;
use std::path::{Path, PathBuf};

use ddtail_template::Template;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::defaults::BuiltinDefaults;
use super::merge::{merge_layers, toml_to_json};
use super::sections::{
    FormatDefinition, QueryDefaults, ServerConfig, SettingsDocument, TailConfig,
};
use super::ConfigError;
use crate::normalize::FieldMapping;

/// File name looked up in the home directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = ".ddtail.toml";

/// Placeholder written over secret values.
pub const REDACTED: &str = "[REDACTED]";

/// Keys that contain secrets and should be redacted
const SECRET_KEYS: &[&str] = &["key", "secret", "token", "password"];

/// Origin of a configuration source
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    File,
    Cli,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl ConfigSource {
    fn builtin() -> Self {
        Self {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        }
    }

    fn cli() -> Self {
        Self {
            origin: ConfigOrigin::Cli,
            path: None,
            digest: None,
        }
    }
}

/// The configuration file layer, if any.
#[derive(Debug, Clone)]
pub enum FileLayer<'a> {
    /// No file layer at all.
    None,
    /// A path that may be absent (the home-directory default).
    Optional(&'a Path),
    /// A path the user asked for; absence is an error.
    Required(&'a Path),
}

/// Effective configuration
#[derive(Debug, Clone)]
pub struct Settings {
    merged: Value,
    sources: Vec<ConfigSource>,
    server: ServerConfig,
    query: QueryDefaults,
    tail: TailConfig,
    field_mapping: FieldMapping,
    formats: Vec<FormatDefinition>,
    templates: Vec<Template>,
}

impl Settings {
    /// Load settings from the given config path, or `~/.ddtail.toml` when
    /// none is given, with optional CLI overrides on top.
    pub fn load(config_path: Option<&Path>, cli_overrides: Option<Value>) -> Result<Self, ConfigError> {
        match config_path {
            Some(path) => {
                let expanded = expand_home(path);
                Self::build(FileLayer::Required(&expanded), cli_overrides)
            }
            None => match default_config_path() {
                Some(path) => Self::build(FileLayer::Optional(&path), cli_overrides),
                None => Self::build(FileLayer::None, cli_overrides),
            },
        }
    }

    /// Build settings from explicit layers
    pub fn build(file: FileLayer<'_>, cli_overrides: Option<Value>) -> Result<Self, ConfigError> {
        let mut layers = vec![BuiltinDefaults::default().to_value()];
        let mut sources = vec![ConfigSource::builtin()];

        let path = match file {
            FileLayer::None => None,
            FileLayer::Optional(path) if !path.exists() => {
                debug!(path = %path.display(), "No configuration file, using defaults");
                None
            }
            FileLayer::Optional(path) => Some(path),
            FileLayer::Required(path) if !path.exists() => {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            FileLayer::Required(path) => Some(path),
        };

        if let Some(path) = path {
            let bytes = fs::read(path).map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            let (value, digest) = parse_toml_bytes(&bytes)?;
            debug!(path = %path.display(), digest = %digest, "Loaded configuration file");
            layers.push(value);
            sources.push(ConfigSource {
                origin: ConfigOrigin::File,
                path: Some(path.to_string_lossy().to_string()),
                digest: Some(digest),
            });
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource::cli());
        }

        Self::from_layers(layers, sources)
    }

    /// Build settings from TOML text layered over the defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let (value, digest) = parse_toml_bytes(contents.as_bytes())?;
        let sources = vec![
            ConfigSource::builtin(),
            ConfigSource {
                origin: ConfigOrigin::File,
                path: None,
                digest: Some(digest),
            },
        ];
        Self::from_layers(vec![BuiltinDefaults::default().to_value(), value], sources)
    }

    fn from_layers(layers: Vec<Value>, sources: Vec<ConfigSource>) -> Result<Self, ConfigError> {
        let merged = merge_layers(layers);
        let doc: SettingsDocument = serde_json::from_value(merged.clone())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        validate(&doc)?;

        let templates = doc
            .format
            .iter()
            .map(|f| Template::parse(f.name.clone(), f.template.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        let field_mapping = FieldMapping::new(
            doc.fields
                .into_iter()
                .map(|(canonical, names)| (canonical, names.into_vec()))
                .collect(),
        );

        Ok(Self {
            merged,
            sources,
            server: doc.server,
            query: doc.query,
            tail: doc.tail,
            field_mapping,
            formats: doc.format,
            templates,
        })
    }

    pub fn server(&self) -> &ServerConfig {
        &self.server
    }

    pub fn query(&self) -> &QueryDefaults {
        &self.query
    }

    pub fn tail(&self) -> &TailConfig {
        &self.tail
    }

    pub fn field_mapping(&self) -> &FieldMapping {
        &self.field_mapping
    }

    pub fn formats(&self) -> &[FormatDefinition] {
        &self.formats
    }

    /// Parsed templates, in fallback order.
    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    /// Contributing sources in precedence order
    pub fn sources(&self) -> &[ConfigSource] {
        &self.sources
    }

    /// Digest of the file layer, if one was loaded.
    pub fn digest(&self) -> Option<&str> {
        self.sources
            .iter()
            .find(|s| s.origin == ConfigOrigin::File)
            .and_then(|s| s.digest.as_deref())
    }

    /// Get a merged value by dot-separated path (unredacted)
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.merged;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// The merged configuration with secrets replaced, plus the redacted paths.
    pub fn redacted(&self) -> (Value, Vec<String>) {
        let mut value = self.merged.clone();
        let mut redactions = Vec::new();
        redact_recursive(&mut value, String::new(), &mut redactions);
        (value, redactions)
    }

    /// Redacted configuration and provenance, for display.
    pub fn to_display_json(&self) -> Value {
        let (config, redactions) = self.redacted();
        serde_json::json!({
            "config": config,
            "sources": self.sources,
            "redactions": redactions,
        })
    }
}

/// `~/.ddtail.toml`, when a home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(DEFAULT_CONFIG_FILE))
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

fn parse_toml_bytes(bytes: &[u8]) -> Result<(Value, String), ConfigError> {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hex::encode(hasher.finalize());

    let contents = std::str::from_utf8(bytes)
        .map_err(|e| ConfigError::Parse(format!("Invalid UTF-8: {}", e)))?;
    let toml_value: toml::Value =
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;

    Ok((toml_to_json(toml_value), digest))
}

fn redact_recursive(value: &mut Value, path: String, redactions: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                let key_lower = key.to_lowercase();
                let current_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };

                let is_secret = SECRET_KEYS.iter().any(|s| key_lower.contains(s));

                if is_secret && !val.is_object() && !val.is_array() && !val.is_null() {
                    *val = Value::String(REDACTED.to_string());
                    redactions.push(current_path);
                } else {
                    redact_recursive(val, current_path, redactions);
                }
            }
        }
        Value::Array(arr) => {
            for (i, val) in arr.iter_mut().enumerate() {
                redact_recursive(val, format!("{}[{}]", path, i), redactions);
            }
        }
        _ => {}
    }
}

fn validate(doc: &SettingsDocument) -> Result<(), ConfigError> {
    if doc.server.url.trim().is_empty() {
        return Err(ConfigError::Invalid("server.url must not be empty".to_string()));
    }

    if doc.server.timeout_seconds == 0 {
        return Err(ConfigError::Invalid(
            "server.timeout_seconds must be greater than 0".to_string(),
        ));
    }

    let tail = &doc.tail;
    if tail.min_delay_ms > tail.max_delay_ms {
        return Err(ConfigError::Invalid(format!(
            "tail.min_delay_ms ({}) must not exceed tail.max_delay_ms ({})",
            tail.min_delay_ms, tail.max_delay_ms
        )));
    }

    if !tail.factor.is_finite() || tail.factor < 1.0 {
        return Err(ConfigError::Invalid(format!(
            "tail.factor must be at least 1.0, got {}",
            tail.factor
        )));
    }

    if tail.dedup_capacity == 0 {
        return Err(ConfigError::Invalid(
            "tail.dedup_capacity must be greater than 0".to_string(),
        ));
    }

    for (i, format) in doc.format.iter().enumerate() {
        if format.name.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("format[{}] has an empty name", i)));
        }
    }

    Ok(())
}
