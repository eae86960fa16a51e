//! Response envelope types.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Three-state page status.
///
/// `Done` is terminal even when a cursor accompanies it. `Ok` with no cursor
/// also ends a page-walk, but the two are kept apart because backend
/// variants disagree on what an empty cursor means.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    #[default]
    Ok,
    Done,
    Error,
}

impl ResponseStatus {
    /// No further pages should be requested.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ResponseStatus::Done | ResponseStatus::Error)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ResponseStatus::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseStatus::Ok => "ok",
            ResponseStatus::Done => "done",
            ResponseStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single returned record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLog {
    /// Identifier, unique within the backend's retention window.
    pub id: String,
    /// Arbitrary attribute object, including a `timestamp`.
    #[serde(default)]
    pub content: serde_json::Value,
}

/// List-logs response body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsResponse {
    #[serde(default)]
    pub logs: Vec<RawLog>,
    /// Continuation cursor; absent, null and empty all mean "no cursor".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_log_id: Option<String>,
    #[serde(default)]
    pub status: ResponseStatus,
}

impl LogsResponse {
    /// Parse a response body.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ProtocolError> {
        serde_json::from_slice(bytes).map_err(ProtocolError::from)
    }

    /// The continuation cursor, with empty strings folded into `None`.
    pub fn cursor(&self) -> Option<&str> {
        self.next_log_id.as_deref().filter(|c| !c.is_empty())
    }
}
