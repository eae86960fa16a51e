//! Paginated retrieval and continuous tailing
//!
//! The engine drains one query window page by page (a page-walk), orders and
//! de-duplicates each batch, and hands surviving entries through the
//! normalizer and renderer to the output. In follow mode it repeats the walk
//! forever, sleeping per the backoff schedule in between.

mod backoff;
mod dedup;
mod engine;

pub use backoff::{BackoffConfig, BackoffScheduler};
pub use dedup::{DedupCache, DEFAULT_DEDUP_CAPACITY};
pub use engine::{EngineConfig, IterationReport, SessionStats, TailEngine, WalkSummary};

use std::io;
use std::time::Duration;

use crate::backend::TransportError;
use crate::exit::FailureKind;

/// Errors that end a search or tail session
#[derive(Debug, thiserror::Error)]
pub enum TailError {
    #[error("{0}")]
    Transport(#[from] TransportError),

    #[error("Backend returned status=error for query '{query}'")]
    Backend { query: String },

    #[error("Failed to write output: {0}")]
    Output(#[from] io::Error),
}

impl TailError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            TailError::Transport(_) => FailureKind::Transport,
            TailError::Backend { .. } => FailureKind::Backend,
            TailError::Output(_) => FailureKind::Output,
        }
    }

    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        self.failure_kind().exit_code().code()
    }

    /// The reader of our output went away (e.g. piped into `head`).
    pub fn is_broken_pipe(&self) -> bool {
        matches!(self, TailError::Output(e) if e.kind() == io::ErrorKind::BrokenPipe)
    }
}

/// Timed waits, abstracted so tests can observe delays without waiting.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

impl<S: Sleeper + ?Sized> Sleeper for &S {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

impl<S: Sleeper + ?Sized> Sleeper for std::sync::Arc<S> {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Blocks the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let transport = TailError::Transport(TransportError::Io("reset".into()));
        assert_eq!(transport.exit_code(), 20);

        let backend = TailError::Backend { query: "*".into() };
        assert_eq!(backend.exit_code(), 30);
        assert_eq!(backend.to_string(), "Backend returned status=error for query '*'");

        let output = TailError::Output(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
        assert_eq!(output.exit_code(), 1);
        assert!(output.is_broken_pipe());
    }
}
