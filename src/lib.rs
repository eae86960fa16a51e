//! ddtail - search and tail hosted logs from the terminal
//!
//! This crate drains paginated log-search results, de-duplicates entries
//! across overlapping polling windows, normalizes heterogeneous log schemas
//! onto a small set of derived fields, and renders each entry through an
//! ordered chain of user templates.

pub mod backend;
pub mod config;
pub mod entry;
pub mod exit;
pub mod logging;
pub mod mock;
pub mod normalize;
pub mod query;
pub mod render;
pub mod session;
pub mod signal;
pub mod tail;

pub use backend::{Fetcher, HttpTransport, Page, TransportError};
pub use config::{ConfigError, Settings};
pub use entry::LogEntry;
pub use normalize::{FieldMapping, Normalizer};
pub use query::{QueryBuilder, QueryError, QueryOptions, TimeWindow};
pub use render::{OutputMode, Renderer};
pub use session::{SearchOptions, SessionError};
pub use tail::{BackoffScheduler, DedupCache, TailEngine, TailError};
