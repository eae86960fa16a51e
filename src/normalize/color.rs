//! ANSI color fields.

use super::fields::*;
use super::level::Level;
use crate::entry::LogEntry;

pub const GREY: &str = "\x1b[37m";
pub const RED: &str = "\x1b[91m";
pub const GREEN: &str = "\x1b[92m";
pub const YELLOW: &str = "\x1b[93m";
pub const BLUE: &str = "\x1b[94m";
pub const MAGENTA: &str = "\x1b[95m";
pub const CYAN: &str = "\x1b[96m";
pub const WHITE: &str = "\x1b[97m";
pub const RESET: &str = "\x1b[39;49m";

/// Named palette entries in field order.
pub const PALETTE: [(&str, &str); 9] = [
    (BLUE_FIELD, BLUE),
    (RED_FIELD, RED),
    (GREEN_FIELD, GREEN),
    (YELLOW_FIELD, YELLOW),
    (GREY_FIELD, GREY),
    (WHITE_FIELD, WHITE),
    (CYAN_FIELD, CYAN),
    (MAGENTA_FIELD, MAGENTA),
    (RESET_FIELD, RESET),
];

/// Escape for a normalized level; empty when the level is not recognized.
pub fn level_color(level: &str) -> &'static str {
    match Level::classify(level).filter(|l| l.as_str() == level) {
        Some(Level::Trace | Level::Debug) => BLUE,
        Some(Level::Info) => GREEN,
        Some(Level::Warn) => YELLOW,
        Some(Level::Error | Level::Fatal) => RED,
        None => "",
    }
}

/// Set every color field. With color disabled all of them are empty so
/// templates that reference them still render.
pub fn apply_colors(entry: &mut LogEntry, level: &str, enabled: bool) {
    for (field, escape) in PALETTE {
        entry.derive(field, if enabled { escape } else { "" });
    }
    entry.derive(LEVEL_COLOR_FIELD, if enabled { level_color(level) } else { "" });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_level_colors() {
        assert_eq!(level_color("DEBUG"), BLUE);
        assert_eq!(level_color("TRACE"), BLUE);
        assert_eq!(level_color("INFO"), GREEN);
        assert_eq!(level_color("WARN"), YELLOW);
        assert_eq!(level_color("ERROR"), RED);
        assert_eq!(level_color("FATAL"), RED);
        assert_eq!(level_color("CUSTOM"), "");
        assert_eq!(level_color(""), "");
    }

    #[test]
    fn test_apply_colors_enabled() {
        let mut entry = LogEntry::new("a", Utc::now());
        apply_colors(&mut entry, "WARN", true);
        assert_eq!(entry.field(LEVEL_COLOR_FIELD), Some(YELLOW));
        assert_eq!(entry.field(RESET_FIELD), Some(RESET));
        assert_eq!(entry.field(MAGENTA_FIELD), Some(MAGENTA));
    }

    #[test]
    fn test_apply_colors_disabled() {
        let mut entry = LogEntry::new("a", Utc::now());
        apply_colors(&mut entry, "ERROR", false);
        for (field, _) in PALETTE {
            assert_eq!(entry.field(field), Some(""));
        }
        assert_eq!(entry.field(LEVEL_COLOR_FIELD), Some(""));
    }
}
