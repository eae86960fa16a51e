//! Field names and the canonical-name mapping table.

use std::collections::BTreeMap;

use crate::entry::LogEntry;

// Canonical names resolved through the mapping
pub const LEVEL: &str = "level";
pub const MESSAGE: &str = "message";
pub const FULL_MESSAGE: &str = "full_message";
pub const CLASSNAME: &str = "classname";
pub const REQUEST_PATH: &str = "request_path";

// Computed fields
pub const LEVEL_FIELD: &str = "_level";
pub const LONG_TIMESTAMP_FIELD: &str = "_long_time_timestamp";
pub const MESSAGE_TEXT_FIELD: &str = "_message_text";
pub const JSON_FIELD: &str = "_json";
pub const SHORT_CLASSNAME_FIELD: &str = "_short_classname";

// Escape codes
pub const LEVEL_COLOR_FIELD: &str = "_level_color";
pub const BLUE_FIELD: &str = "_blue";
pub const RED_FIELD: &str = "_red";
pub const GREEN_FIELD: &str = "_green";
pub const YELLOW_FIELD: &str = "_yellow";
pub const GREY_FIELD: &str = "_grey";
pub const WHITE_FIELD: &str = "_white";
pub const CYAN_FIELD: &str = "_cyan";
pub const MAGENTA_FIELD: &str = "_magenta";
pub const RESET_FIELD: &str = "_reset";

/// Built-in candidate lists, in lookup order.
pub fn default_field_names() -> Vec<(&'static str, Vec<&'static str>)> {
    vec![
        (LEVEL, vec!["level", "status", "loglevel", "log_status"]),
        (MESSAGE, vec!["message", "msg"]),
        (FULL_MESSAGE, vec!["full_message", "original_message"]),
        (CLASSNAME, vec!["logger_name"]),
        (REQUEST_PATH, vec!["request_page"]),
    ]
}

/// Canonical field name -> ordered candidate raw names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    candidates: BTreeMap<String, Vec<String>>,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self::new(
            default_field_names()
                .into_iter()
                .map(|(k, names)| (k.to_string(), names.into_iter().map(str::to_string).collect()))
                .collect(),
        )
    }
}

impl FieldMapping {
    pub fn new(candidates: BTreeMap<String, Vec<String>>) -> Self {
        Self { candidates }
    }

    /// Replace the candidate list for one canonical name.
    pub fn with(mut self, canonical: &str, names: &[&str]) -> Self {
        self.candidates.insert(
            canonical.to_string(),
            names.iter().map(|n| n.to_string()).collect(),
        );
        self
    }

    pub fn candidates(&self, canonical: &str) -> Option<&[String]> {
        self.candidates.get(canonical).map(Vec::as_slice)
    }

    /// Name of the first candidate present in the entry's raw fields.
    ///
    /// An unmapped canonical name is looked up as a raw name directly.
    pub fn resolve_key<'a>(&'a self, entry: &LogEntry, canonical: &'a str) -> Option<&'a str> {
        match self.candidates.get(canonical) {
            Some(names) => names
                .iter()
                .map(String::as_str)
                .find(|name| entry.raw.contains_key(*name)),
            None => entry.raw.contains_key(canonical).then_some(canonical),
        }
    }

    /// Value of the first candidate present in the entry's raw fields.
    pub fn resolve<'e>(&self, entry: &'e LogEntry, canonical: &str) -> Option<&'e str> {
        let key = self.resolve_key(entry, canonical)?;
        entry.raw.get(key).map(String::as_str)
    }
}
