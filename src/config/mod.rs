//! Configuration merge system
//!
//! Implements the layered configuration merge:
//! 1. Built-in defaults
//! 2. User config file (~/.ddtail.toml, or the path given on the command line)
//! 3. CLI flags

mod defaults;
mod merge;
mod sections;
mod settings;

use std::path::PathBuf;

pub use defaults::{BuiltinDefaults, DEFAULT_URL};
pub use merge::{deep_merge, merge_layers, toml_to_json};
pub use sections::{FieldNames, FormatDefinition, QueryDefaults, ServerConfig, TailConfig};
pub use settings::{
    default_config_path, expand_home, ConfigOrigin, ConfigSource, FileLayer, Settings,
    DEFAULT_CONFIG_FILE, REDACTED,
};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read configuration file {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("Configuration file cannot be parsed: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration file not found at {0}")]
    NotFound(PathBuf),

    #[error("Invalid format: {0}")]
    Template(#[from] ddtail_template::TemplateError),
}

impl ConfigError {
    /// Process exit code for configuration failures
    pub fn exit_code(&self) -> i32 {
        1
    }
}
