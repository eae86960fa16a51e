//! ddtail Protocol Types
//!
//! Defines the JSON request payload and response envelope for the hosted
//! log-search list endpoint.

pub mod error;
pub mod request;
pub mod response;

pub use error::ProtocolError;
pub use request::{LogsQuery, Sort, TimeRange};
pub use response::{LogsResponse, RawLog, ResponseStatus};

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_LIMIT: u32 = 50;

/// Query text that matches every log entry.
pub const MATCH_ALL_QUERY: &str = "*";

/// Format for absolute `time.from` / `time.to` values in requests.
pub const INPUT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format of the `timestamp` attribute inside returned log content.
pub const OUTPUT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";
