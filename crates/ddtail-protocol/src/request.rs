//! Request payload types.

use serde::{Deserialize, Serialize};

/// Sort order for returned entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sort {
    Asc,
    #[default]
    Desc,
}

/// Time bounds of a query window.
///
/// Values are either absolute (`2019-10-03 13:22:52`) or relative
/// expressions understood by the backend (`now - 60s`, `now`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: String,
    pub to: String,
}

/// List-logs request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsQuery {
    /// Search expression.
    pub query: String,
    /// Window to search.
    pub time: TimeRange,
    /// Sort order (the engine always asks for descending).
    pub sort: Sort,
    /// Maximum entries per page.
    pub limit: u32,
    /// Continuation cursor from a previous page (omitted on the first page).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_at: Option<String>,
}

impl LogsQuery {
    /// Whether this request continues a previous page.
    pub fn is_continuation(&self) -> bool {
        self.start_at.is_some()
    }
}
