//! Signal handling for SIGINT/SIGTERM
//!
//! A tail session has nothing to clean up: output is written and flushed line
//! by line and no state is persisted. On the first signal the process exits
//! immediately with code 0; an in-flight page-walk is abandoned. The stop
//! flag is raised first so embedders running the engine on their own thread
//! can observe the request.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

/// Exit code for a user interrupt
pub const EXIT_CODE_INTERRUPTED: i32 = 0;

/// Signal handler state
#[derive(Debug, Default)]
pub struct SignalState {
    /// Raised on the first signal
    stop_requested: Arc<AtomicBool>,
    /// Signals received so far
    signal_count: AtomicU8,
}

impl SignalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag shared with the engine's follow loop
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop_requested)
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    pub fn signal_count(&self) -> u8 {
        self.signal_count.load(Ordering::SeqCst)
    }

    /// Handle a signal (SIGINT/SIGTERM)
    ///
    /// Returns the appropriate action to take
    pub fn handle_signal(&self) -> SignalAction {
        let count = self.signal_count.fetch_add(1, Ordering::SeqCst);
        self.stop_requested.store(true, Ordering::SeqCst);

        if count == 0 {
            SignalAction::Exit
        } else {
            // Exit already under way
            SignalAction::Ignore
        }
    }
}

/// Action to take after receiving a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// First signal: end the process now
    Exit,
    /// Later signals: nothing more to do
    Ignore,
}

/// Signal handler that manages the signal state
pub struct SignalHandler {
    state: Arc<SignalState>,
}

impl SignalHandler {
    pub fn new() -> Self {
        Self {
            state: Arc::new(SignalState::new()),
        }
    }

    /// Get a reference to the signal state
    pub fn state(&self) -> Arc<SignalState> {
        Arc::clone(&self.state)
    }

    /// Install the signal handlers
    ///
    /// This sets up handlers for SIGINT and SIGTERM.
    /// Must be called once at program startup.
    pub fn install(&self) -> Result<(), ctrlc::Error> {
        let state = Arc::clone(&self.state);
        ctrlc::set_handler(move || {
            if state.handle_signal() == SignalAction::Exit {
                tracing::debug!("Interrupted, exiting");
                std::process::exit(EXIT_CODE_INTERRUPTED);
            }
        })
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_state_initial() {
        let state = SignalState::new();
        assert!(!state.is_stop_requested());
        assert_eq!(state.signal_count(), 0);
    }

    #[test]
    fn test_first_signal_exits() {
        let state = SignalState::new();
        let flag = state.stop_flag();

        assert_eq!(state.handle_signal(), SignalAction::Exit);
        assert!(state.is_stop_requested());
        assert!(flag.load(Ordering::SeqCst));
        assert_eq!(state.signal_count(), 1);
    }

    #[test]
    fn test_later_signals_ignored() {
        let state = SignalState::new();
        state.handle_signal();
        assert_eq!(state.handle_signal(), SignalAction::Ignore);
        assert_eq!(state.handle_signal(), SignalAction::Ignore);
        assert_eq!(state.signal_count(), 3);
    }
}
