//! Built-in defaults (layer 1)
//!
//! Hardcoded defaults for all configuration values.

use serde::{Deserialize, Serialize};

use crate::normalize::fields::default_field_names;

/// Default backend endpoint.
pub const DEFAULT_URL: &str = "https://api.datadoghq.com/api/v1/logs-queries/list";

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Backend endpoint
    pub url: String,

    /// HTTP request timeout in seconds (default: 30)
    pub timeout_seconds: u64,

    /// Page size (default: 50)
    pub limit: i64,

    /// Relative window when no absolute range is given (default: 60)
    pub range_seconds: u64,

    /// Backoff minimum and initial delay (default: 1000)
    pub min_delay_ms: u64,

    /// Backoff ceiling (default: 30000)
    pub max_delay_ms: u64,

    /// Backoff growth per empty iteration (default: 2.0)
    pub factor: f64,

    /// Pacing between pages of one page-walk (default: 200)
    pub page_delay_ms: u64,

    /// Dedup cache capacity (default: 1024)
    pub dedup_capacity: usize,

    /// Retry transient transport errors in tail mode (default: true)
    pub retry_transient_errors: bool,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            timeout_seconds: 30,
            limit: i64::from(ddtail_protocol::DEFAULT_PAGE_LIMIT),
            range_seconds: 60,
            min_delay_ms: 1000,
            max_delay_ms: 30_000,
            factor: 2.0,
            page_delay_ms: 200,
            dedup_capacity: 1024,
            retry_transient_errors: true,
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        let fields: serde_json::Map<String, serde_json::Value> = default_field_names()
            .into_iter()
            .map(|(canonical, names)| (canonical.to_string(), serde_json::json!(names)))
            .collect();

        serde_json::json!({
            "server": {
                "url": self.url,
                "timeout_seconds": self.timeout_seconds
            },
            "query": {
                "limit": self.limit,
                "range_seconds": self.range_seconds
            },
            "tail": {
                "min_delay_ms": self.min_delay_ms,
                "max_delay_ms": self.max_delay_ms,
                "factor": self.factor,
                "page_delay_ms": self.page_delay_ms,
                "dedup_capacity": self.dedup_capacity,
                "retry_transient_errors": self.retry_transient_errors
            },
            "fields": fields,
            "format": []
        })
    }
}
