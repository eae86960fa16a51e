//! Page decoding
//!
//! Turns a wire `LogsResponse` into typed entries. Each record's `content`
//! object is flattened into a string map:
//! - nested object keys are joined with `_`
//! - a top-level `attributes` object contributes its children unprefixed;
//!   on a name collision the top-level field keeps its value
//! - numbers and booleans are stringified
//! - arrays and nulls are skipped, except the top-level `tags` list

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use ddtail_protocol::{LogsResponse, RawLog, ResponseStatus, OUTPUT_TIME_FORMAT};
use serde_json::{Map, Value};
use tracing::warn;

use crate::entry::LogEntry;

/// Attribute holding the record time.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Attribute holding the tag list.
pub const TAGS_FIELD: &str = "tags";

/// Object whose children are merged without a prefix.
const ATTRIBUTES_OBJECT: &str = "attributes";

/// One decoded response.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Entries in backend order (typically newest first).
    pub entries: Vec<LogEntry>,
    /// Continuation cursor; `None` when absent or empty.
    pub next_cursor: Option<String>,
    pub status: ResponseStatus,
    /// Records dropped because they could not be decoded.
    pub dropped: usize,
}

impl Page {
    /// Decode a response, dropping malformed records with a diagnostic.
    pub fn from_response(response: LogsResponse) -> Self {
        let next_cursor = response.cursor().map(str::to_string);
        let mut entries = Vec::with_capacity(response.logs.len());
        let mut dropped = 0;

        for raw in response.logs {
            match decode_entry(raw) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!("{}", e);
                    dropped += 1;
                }
            }
        }

        Self {
            entries,
            next_cursor,
            status: response.status,
            dropped,
        }
    }
}

/// A record that could not be turned into an entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntryError {
    #[error("Log entry {id} has no timestamp")]
    MissingTimestamp { id: String },

    #[error("Invalid json timestamp: {value} - {reason}")]
    InvalidTimestamp {
        id: String,
        value: String,
        reason: String,
    },
}

/// Decode one record.
pub fn decode_entry(raw: RawLog) -> Result<LogEntry, EntryError> {
    let (fields, tags) = flatten_content(&raw.content);

    let ts_str = fields
        .get(TIMESTAMP_FIELD)
        .ok_or_else(|| EntryError::MissingTimestamp { id: raw.id.clone() })?;
    let timestamp = parse_timestamp(ts_str).map_err(|reason| EntryError::InvalidTimestamp {
        id: raw.id.clone(),
        value: ts_str.clone(),
        reason,
    })?;

    Ok(LogEntry {
        id: raw.id,
        timestamp,
        raw: fields,
        derived: BTreeMap::new(),
        tags,
    })
}

/// Parse a record timestamp (`2019-10-03T13:22:52.882Z`; RFC 3339 also accepted).
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    match NaiveDateTime::parse_from_str(value, OUTPUT_TIME_FORMAT) {
        Ok(naive) => Ok(naive.and_utc()),
        Err(primary) => DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| primary.to_string()),
    }
}

/// Flatten a content object into string fields plus its tag list.
pub fn flatten_content(content: &Value) -> (BTreeMap<String, String>, Vec<String>) {
    let mut fields = BTreeMap::new();
    let mut tags = Vec::new();

    if let Value::Object(map) = content {
        if let Some(Value::Array(items)) = map.get(TAGS_FIELD) {
            tags = items.iter().filter_map(scalar_to_string).collect();
        }
        flatten_into(map, "", Merge::Replace, &mut fields);
        if let Some(Value::Object(attributes)) = map.get(ATTRIBUTES_OBJECT) {
            flatten_into(attributes, "", Merge::KeepExisting, &mut fields);
        }
    }

    (fields, tags)
}

/// How a flattened value treats a key that is already present.
#[derive(Clone, Copy)]
enum Merge {
    Replace,
    KeepExisting,
}

fn flatten_into(
    map: &Map<String, Value>,
    path: &str,
    merge: Merge,
    out: &mut BTreeMap<String, String>,
) {
    for (key, value) in map {
        let full_key = if path.is_empty() {
            key.clone()
        } else {
            format!("{}_{}", path, key)
        };

        match value {
            // Merged unprefixed by the caller, after every other field.
            Value::Object(_)
                if path.is_empty()
                    && full_key == ATTRIBUTES_OBJECT
                    && matches!(merge, Merge::Replace) => {}
            Value::Object(inner) => flatten_into(inner, &full_key, merge, out),
            other => {
                if let Some(s) = scalar_to_string(other) {
                    match merge {
                        Merge::Replace => {
                            out.insert(full_key, s);
                        }
                        Merge::KeepExisting => {
                            out.entry(full_key).or_insert(s);
                        }
                    }
                }
            }
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn raw(id: &str, content: Value) -> RawLog {
        RawLog {
            id: id.to_string(),
            content,
        }
    }

    #[test]
    fn test_flatten_nested_and_attributes() {
        let content = json!({
            "timestamp": "2019-10-03T13:22:52.882Z",
            "host": "web-1",
            "attributes": {
                "level": "info",
                "http": {"status_code": 200, "method": "GET"},
                "sampled": true
            },
            "tags": ["env:prod", "team:core"],
            "ignored": [1, 2],
            "nothing": null
        });

        let (fields, tags) = flatten_content(&content);
        assert_eq!(fields["host"], "web-1");
        assert_eq!(fields["level"], "info");
        assert_eq!(fields["http_status_code"], "200");
        assert_eq!(fields["http_method"], "GET");
        assert_eq!(fields["sampled"], "true");
        assert!(!fields.contains_key("ignored"));
        assert!(!fields.contains_key("nothing"));
        assert!(!fields.contains_key("tags"));
        assert_eq!(tags, vec!["env:prod", "team:core"]);
    }

    #[test]
    fn test_top_level_field_wins_over_attribute() {
        let content = json!({
            "app": "app-top",
            "message": "msg-top",
            "attributes": {
                "app": "app-attr",
                "message": "msg-attr",
                "level": "warn",
                "http": {"method": "GET"}
            },
            "http": {"method": "POST"}
        });

        let (fields, _) = flatten_content(&content);
        assert_eq!(fields["app"], "app-top");
        assert_eq!(fields["message"], "msg-top");
        assert_eq!(fields["level"], "warn");
        assert_eq!(fields["http_method"], "POST");
        assert!(!fields.contains_key("attributes_app"));
    }

    #[test]
    fn test_nested_attributes_object_keeps_prefix() {
        let content = json!({"meta": {"attributes": {"a": "1"}}});
        let (fields, _) = flatten_content(&content);
        assert_eq!(fields["meta_attributes_a"], "1");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.timestamp_millis_opt(1_570_108_972_882).unwrap();
        assert_eq!(parse_timestamp("2019-10-03T13:22:52.882Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2019-10-03T15:22:52.882+02:00").unwrap(), expected);
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_decode_entry() {
        let entry = decode_entry(raw(
            "AQAA",
            json!({"timestamp": "2019-10-03T13:22:52.882Z", "message": "hi"}),
        ))
        .unwrap();
        assert_eq!(entry.id, "AQAA");
        assert_eq!(entry.raw["message"], "hi");
        assert!(entry.derived.is_empty());
    }

    #[test]
    fn test_page_drops_malformed_entries() {
        let response = LogsResponse {
            logs: vec![
                raw("good", json!({"timestamp": "2019-10-03T13:22:52.882Z"})),
                raw("bad", json!({"timestamp": "03/10/2019"})),
                raw("none", json!({"message": "no time"})),
            ],
            next_log_id: Some("next".to_string()),
            status: ResponseStatus::Ok,
        };

        let page = Page::from_response(response);
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.entries[0].id, "good");
        assert_eq!(page.dropped, 2);
        assert_eq!(page.next_cursor.as_deref(), Some("next"));
    }

    #[test]
    fn test_entry_error_messages() {
        let err = decode_entry(raw("x", json!({"timestamp": "bogus"}))).unwrap_err();
        assert!(err.to_string().starts_with("Invalid json timestamp: bogus"));

        let err = decode_entry(raw("y", json!({}))).unwrap_err();
        assert_eq!(err, EntryError::MissingTimestamp { id: "y".to_string() });
    }
}
