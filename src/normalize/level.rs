//! Level classification.

use std::fmt;

/// A recognized severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Level {
    /// Classify by the first letter of the uppercased value.
    pub fn classify(value: &str) -> Option<Self> {
        match value.trim_start().chars().next()?.to_ascii_uppercase() {
            'T' => Some(Level::Trace),
            'D' => Some(Level::Debug),
            'I' => Some(Level::Info),
            'W' => Some(Level::Warn),
            'E' => Some(Level::Error),
            'F' => Some(Level::Fatal),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical level text: a recognized level's name, otherwise the value
/// uppercased unchanged.
pub fn normalize_level(value: &str) -> String {
    match Level::classify(value) {
        Some(level) => level.as_str().to_string(),
        None => value.to_uppercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(normalize_level("error"), "ERROR");
        assert_eq!(normalize_level("ERR"), "ERROR");
        assert_eq!(normalize_level("E"), "ERROR");
        assert_eq!(normalize_level("info"), "INFO");
        assert_eq!(normalize_level("Warning"), "WARN");
        assert_eq!(normalize_level("fatal"), "FATAL");
        assert_eq!(normalize_level("dbg"), "DEBUG");
        assert_eq!(normalize_level("trace"), "TRACE");
    }

    #[test]
    fn test_unrecognized_passes_through_uppercased() {
        assert_eq!(normalize_level("CUSTOM"), "CUSTOM");
        assert_eq!(normalize_level("notice"), "NOTICE");
        assert_eq!(normalize_level(""), "");
    }
}
