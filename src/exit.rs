//! Failure taxonomy and stable exit codes

use serde::{Deserialize, Serialize};

/// Failure kind - categorizes the cause of a failed command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// Unreadable, unparsable or invalid configuration
    Config,
    /// Bad command-line values
    Usage,
    /// Network, HTTP or response decoding failure
    Transport,
    /// Backend answered with status=error
    Backend,
    /// Writing rendered output failed
    Output,
}

impl FailureKind {
    /// Get the stable exit code for this failure kind
    pub fn exit_code(&self) -> ExitCode {
        match self {
            FailureKind::Config | FailureKind::Usage | FailureKind::Output => ExitCode::Failure,
            FailureKind::Transport => ExitCode::Transport,
            FailureKind::Backend => ExitCode::Backend,
        }
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            FailureKind::Config => "Configuration error",
            FailureKind::Usage => "Invalid arguments",
            FailureKind::Transport => "Backend request failed",
            FailureKind::Backend => "Backend reported an error",
            FailureKind::Output => "Writing output failed",
        }
    }
}

/// Stable exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful execution, or interrupted by the user
    Success = 0,
    /// Configuration, usage or output failure
    Failure = 1,
    /// Backend unreachable or returned an unusable response
    Transport = 20,
    /// Backend reported status=error
    Backend = 30,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}
