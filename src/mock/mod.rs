//! Mock Backend Implementation
//!
//! In-process test doubles for the engine:
//!
//! - `MockBackend`: serves scripted pages in order, records every request,
//!   and supports transport failure injection
//! - `RecordingSleeper`: records delays instead of waiting
//! - `raw_log` / `message_log`: record builders

mod backend;
mod failure;
mod sleeper;

pub use backend::{message_log, raw_log, MockBackend};
pub use failure::{FailureConfig, FailureInjector};
pub use sleeper::RecordingSleeper;
