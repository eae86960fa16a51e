//! Machine-readable fallback representation.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::backend::page::TAGS_FIELD;
use crate::entry::LogEntry;

#[derive(Serialize)]
struct JsonView<'a> {
    #[serde(flatten)]
    fields: BTreeMap<&'a str, &'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<&'a [String]>,
}

/// Compact JSON of the entry's raw and derived fields (sorted by key) plus
/// its tag list when non-empty.
pub fn json_fallback(entry: &LogEntry) -> String {
    let mut fields: BTreeMap<&str, &str> = entry
        .raw
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    fields.extend(entry.derived.iter().map(|(k, v)| (k.as_str(), v.as_str())));

    let tags = (!entry.tags.is_empty()).then_some(entry.tags.as_slice());
    if tags.is_some() {
        // The tag list owns the key.
        fields.remove(TAGS_FIELD);
    }

    let view = JsonView { fields, tags };
    // Serializing string maps cannot fail.
    serde_json::to_string(&view).unwrap_or_default()
}
