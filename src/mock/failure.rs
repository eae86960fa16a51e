//! Failure Injection for the Mock Backend
//!
//! Supports configurable failure injection for testing error paths.

use std::collections::VecDeque;

use crate::backend::TransportError;

/// One injected failure
#[derive(Debug, Clone)]
pub struct FailureConfig {
    /// Error to return
    pub error: TransportError,
    /// Successful calls to let through before failing
    pub after_calls: u32,
    /// Number of times to fail before succeeding (None = always fail)
    pub fail_count: Option<u32>,
}

impl FailureConfig {
    /// Fail every call with the given error
    pub fn error(error: TransportError) -> Self {
        Self {
            error,
            after_calls: 0,
            fail_count: None,
        }
    }

    /// Connection refused
    pub fn connect(url: impl Into<String>) -> Self {
        Self::error(TransportError::Connect {
            url: url.into(),
            message: "connection refused".to_string(),
        })
    }

    /// HTTP error status with body
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::error(TransportError::from_status(status, body))
    }

    /// Start failing after this many successful calls
    pub fn after_calls(mut self, calls: u32) -> Self {
        self.after_calls = calls;
        self
    }

    /// Set the number of times to fail before succeeding
    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.fail_count = Some(count);
        self
    }
}

/// Failure injector for the mock backend
///
/// Failures are consulted in injection order; the first one still armed for
/// the current call wins.
#[derive(Debug, Default)]
pub struct FailureInjector {
    configs: VecDeque<(FailureConfig, u32)>,
    calls: u32,
}

impl FailureInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a failure
    pub fn inject(&mut self, config: FailureConfig) {
        self.configs.push_back((config, 0));
    }

    /// Clear all failure injections
    pub fn clear(&mut self) {
        self.configs.clear();
    }

    /// Calls checked so far
    pub fn calls(&self) -> u32 {
        self.calls
    }

    /// Record a call and return the error it should fail with, if any
    pub fn check(&mut self) -> Option<TransportError> {
        self.calls += 1;
        let call = self.calls;

        for (config, fired) in self.configs.iter_mut() {
            if call <= config.after_calls {
                continue;
            }
            if let Some(limit) = config.fail_count {
                if *fired >= limit {
                    continue;
                }
            }
            *fired += 1;
            return Some(config.error.clone());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_failure_configured() {
        let mut injector = FailureInjector::new();
        assert!(injector.check().is_none());
        assert_eq!(injector.calls(), 1);
    }

    #[test]
    fn test_fail_count() {
        let mut injector = FailureInjector::new();
        injector.inject(FailureConfig::status(503, "unavailable").with_fail_count(2));

        assert!(injector.check().is_some());
        assert!(injector.check().is_some());
        assert!(injector.check().is_none());
    }

    #[test]
    fn test_after_calls() {
        let mut injector = FailureInjector::new();
        injector.inject(FailureConfig::connect("https://x").after_calls(2).with_fail_count(1));

        assert!(injector.check().is_none());
        assert!(injector.check().is_none());
        assert!(matches!(injector.check(), Some(TransportError::Connect { .. })));
        assert!(injector.check().is_none());
    }

    #[test]
    fn test_clear() {
        let mut injector = FailureInjector::new();
        injector.inject(FailureConfig::status(401, "denied"));
        assert!(injector.check().is_some());

        injector.clear();
        assert!(injector.check().is_none());
    }
}
