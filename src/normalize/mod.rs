//! Entry normalization
//!
//! Derives the canonical `_`-prefixed fields templates are written against,
//! from whatever raw schema a log source uses. Every step is best-effort: a
//! missing or odd value degrades to an empty or absent field and never fails
//! the pipeline.
//!
//! Order matters: the JSON fallback captures the raw fields plus the level,
//! classname and timestamp fields derived before it, but not the message
//! text or color escapes.

pub mod color;
pub mod fields;
pub mod json;
pub mod level;
pub mod text;

use chrono::{Local, SecondsFormat};

pub use fields::FieldMapping;
pub use level::{normalize_level, Level};

use crate::entry::LogEntry;
use fields::*;

/// Long timestamp pattern: millisecond precision with numeric offset.
pub const LONG_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%:z";

/// Turns raw entries into render-ready ones.
#[derive(Debug, Clone)]
pub struct Normalizer {
    mapping: FieldMapping,
    color: bool,
    utc: bool,
}

impl Normalizer {
    pub fn new(mapping: FieldMapping) -> Self {
        Self {
            mapping,
            color: false,
            utc: false,
        }
    }

    /// Emit ANSI escapes in the color fields.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Format the long timestamp in UTC instead of the local zone.
    pub fn with_utc(mut self, utc: bool) -> Self {
        self.utc = utc;
        self
    }

    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    pub fn color(&self) -> bool {
        self.color
    }

    /// Add derived fields to one entry.
    pub fn normalize(&self, entry: &mut LogEntry) {
        for value in entry.raw.values_mut() {
            if value.contains('\\') {
                *value = text::unescape(value);
            }
        }

        if let Some(key) = self.mapping.resolve_key(entry, REQUEST_PATH) {
            let key = key.to_string();
            if let Some(fixed) = entry.raw.get(&key).and_then(|p| text::normalize_request_path(p)) {
                entry.raw.insert(key, fixed);
            }
        }

        let long_time = self.long_time(entry);
        entry.derive(LONG_TIMESTAMP_FIELD, long_time);

        if let Some(classname) = self.mapping.resolve(entry, CLASSNAME).filter(|c| !c.is_empty()) {
            let short = text::short_classname(classname).to_string();
            entry.derive(SHORT_CLASSNAME_FIELD, short);
        }

        let level = normalize_level(self.mapping.resolve(entry, LEVEL).unwrap_or(""));
        entry.derive(LEVEL_FIELD, level.clone());

        let json = json::json_fallback(entry);
        let mut message = text::message_text(
            self.mapping.resolve(entry, MESSAGE),
            self.mapping.resolve(entry, FULL_MESSAGE),
        );
        if message.is_empty() {
            message = json.clone();
        }
        entry.derive(JSON_FIELD, json);
        entry.derive(MESSAGE_TEXT_FIELD, message);

        color::apply_colors(entry, &level, self.color);
    }

    fn long_time(&self, entry: &LogEntry) -> String {
        if self.utc {
            entry.timestamp.to_rfc3339_opts(SecondsFormat::Millis, false)
        } else {
            entry
                .timestamp
                .with_timezone(&Local)
                .format(LONG_TIME_FORMAT)
                .to_string()
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(FieldMapping::default())
    }
}
