//! Query construction
//!
//! `QueryBuilder` turns the user's options plus the current cursor into a
//! fresh `LogsQuery` on every call. Nothing downstream holds on to a payload
//! between fetches.

use std::sync::OnceLock;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use ddtail_protocol::{
    LogsQuery, Sort, TimeRange, DEFAULT_PAGE_LIMIT, INPUT_TIME_FORMAT, MATCH_ALL_QUERY,
};
use regex_lite::Regex;
use tracing::warn;

/// Query construction errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("Invalid range '{0}': expected seconds or a number with s, m, h or d suffix")]
    InvalidRange(String),

    #[error("Invalid time '{value}': {reason}")]
    InvalidTime { value: String, reason: String },

    #[error("Start time {start} is after end time {end}")]
    InvertedRange { start: String, end: String },
}

/// Time bounds of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    /// The last N seconds, evaluated by the backend at request time.
    Relative(u64),
    /// Fixed bounds.
    Absolute {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl TimeWindow {
    /// Pick a window from CLI inputs. Absolute bounds win only when both
    /// endpoints are given.
    pub fn resolve(
        range_seconds: u64,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Self, QueryError> {
        match (start, end) {
            (Some(start), Some(end)) => {
                if start > end {
                    return Err(QueryError::InvertedRange {
                        start: start.format(INPUT_TIME_FORMAT).to_string(),
                        end: end.format(INPUT_TIME_FORMAT).to_string(),
                    });
                }
                Ok(TimeWindow::Absolute { start, end })
            }
            (None, None) => Ok(TimeWindow::Relative(range_seconds)),
            _ => {
                warn!("Both --start and --end are needed for an absolute range; using the last {}s", range_seconds);
                Ok(TimeWindow::Relative(range_seconds))
            }
        }
    }

    fn to_range(self) -> TimeRange {
        match self {
            TimeWindow::Relative(seconds) => TimeRange {
                from: format!("now - {}s", seconds),
                to: "now".to_string(),
            },
            TimeWindow::Absolute { start, end } => TimeRange {
                from: start.format(INPUT_TIME_FORMAT).to_string(),
                to: end.format(INPUT_TIME_FORMAT).to_string(),
            },
        }
    }
}

/// What the user asked to search for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    pub window: TimeWindow,
    /// Search text; empty means match everything.
    pub text: String,
    /// Requested page size; zero or negative means the built-in default.
    pub limit: i64,
}

impl QueryOptions {
    pub fn new(window: TimeWindow) -> Self {
        Self {
            window,
            text: String::new(),
            limit: 0,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Page size actually sent.
    pub fn effective_limit(&self) -> u32 {
        if self.limit <= 0 {
            DEFAULT_PAGE_LIMIT
        } else {
            u32::try_from(self.limit).unwrap_or(u32::MAX)
        }
    }

    /// Search text actually sent.
    pub fn effective_text(&self) -> &str {
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            MATCH_ALL_QUERY
        } else {
            trimmed
        }
    }
}

/// Builds one independent payload per fetch.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    options: QueryOptions,
}

impl QueryBuilder {
    pub fn new(options: QueryOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Payload for the next page. `cursor` is `None` on the first page of a
    /// window; empty cursors are treated as absent.
    pub fn build(&self, cursor: Option<&str>) -> LogsQuery {
        LogsQuery {
            query: self.options.effective_text().to_string(),
            time: self.options.window.to_range(),
            sort: Sort::Desc,
            limit: self.options.effective_limit(),
            start_at: cursor.filter(|c| !c.is_empty()).map(str::to_string),
        }
    }
}

/// Parse a relative range: plain seconds (`90`) or a suffixed number
/// (`30s`, `15m`, `2h`, `1d`).
pub fn parse_range(value: &str) -> Result<Duration, QueryError> {
    let invalid = || QueryError::InvalidRange(value.to_string());
    let re = range_regex().ok_or_else(invalid)?;
    let caps = re.captures(value).ok_or_else(invalid)?;

    let amount: u64 = caps[1].parse().map_err(|_| invalid())?;
    let unit = match &caps[2] {
        "" | "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86_400,
        _ => return Err(invalid()),
    };

    amount
        .checked_mul(unit)
        .map(Duration::from_secs)
        .ok_or_else(invalid)
}

fn range_regex() -> Option<&'static Regex> {
    static RANGE_RE: OnceLock<Option<Regex>> = OnceLock::new();
    RANGE_RE
        .get_or_init(|| Regex::new(r"^\s*(\d+)\s*([smhd]?)\s*$").ok())
        .as_ref()
}

/// Parse an absolute time: `YYYY-MM-DD HH:MM:SS` in the local zone, or
/// RFC 3339 with an explicit offset.
pub fn parse_time(value: &str) -> Result<DateTime<Utc>, QueryError> {
    let trimmed = value.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, INPUT_TIME_FORMAT) {
        return Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| QueryError::InvalidTime {
                value: value.to_string(),
                reason: "time does not exist in the local zone".to_string(),
            });
    }

    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| QueryError::InvalidTime {
            value: value.to_string(),
            reason: e.to_string(),
        })
}
