//! Log entry model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ddtail_template::Context;

/// A single fetched log record.
///
/// Created per fetched record, enriched by the normalizer, rendered once and
/// then dropped. Nothing here is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// Backend identifier, unique within the retention window.
    pub id: String,
    /// Event time, parsed from the record's `timestamp` attribute.
    pub timestamp: DateTime<Utc>,
    /// Flattened attributes as returned by the backend.
    pub raw: BTreeMap<String, String>,
    /// Fields computed by the normalizer (names start with `_`).
    pub derived: BTreeMap<String, String>,
    /// Tag list attached to the record.
    pub tags: Vec<String>,
}

impl LogEntry {
    pub fn new(id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            timestamp,
            raw: BTreeMap::new(),
            derived: BTreeMap::new(),
            tags: Vec::new(),
        }
    }

    /// Builder-style raw field setter.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.raw.insert(key.into(), value.into());
        self
    }

    /// Look up a field, preferring derived values over raw ones.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.derived
            .get(key)
            .or_else(|| self.raw.get(key))
            .map(String::as_str)
    }

    /// Set a derived field.
    pub fn derive(&mut self, key: &str, value: impl Into<String>) {
        self.derived.insert(key.to_string(), value.into());
    }

    /// Raw and derived fields in one map (derived wins on collision).
    pub fn all_fields(&self) -> BTreeMap<String, String> {
        let mut fields = self.raw.clone();
        fields.extend(self.derived.iter().map(|(k, v)| (k.clone(), v.clone())));
        fields
    }
}

impl Context for LogEntry {
    fn lookup(&self, key: &str) -> Option<&str> {
        self.field(key)
    }
}
