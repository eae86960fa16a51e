//! Output rendering
//!
//! In formatted mode the configured templates are tried in order and the
//! first that renders to non-empty text wins. A template that references a
//! field the entry lacks is simply skipped; that strictness is what lets one
//! configuration cover log sources with different shapes. When nothing
//! matches, the JSON fallback is printed behind a sentinel marker.

use ddtail_template::{Template, TemplateError};
use tracing::trace;

use crate::config::FormatDefinition;
use crate::entry::LogEntry;
use crate::normalize::fields::JSON_FIELD;

/// Marker printed before entries no configured format could render.
pub const NO_FORMAT_SENTINEL: &str = "No Formats Defined>>";

/// How entries are turned into lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Fallback chain of templates.
    Formatted,
    /// The JSON fallback verbatim.
    Json,
}

/// One rendered entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    /// Name of the template that produced the text; `None` for JSON output
    /// and the sentinel fallback.
    pub format: Option<String>,
}

impl Rendered {
    pub fn is_fallback(&self) -> bool {
        self.format.is_none()
    }
}

/// Applies the configured output mode.
#[derive(Debug, Clone)]
pub struct Renderer {
    mode: OutputMode,
    templates: Vec<Template>,
}

impl Renderer {
    pub fn new(mode: OutputMode, templates: Vec<Template>) -> Self {
        Self { mode, templates }
    }

    /// Parse format definitions into a renderer.
    pub fn from_formats(mode: OutputMode, formats: &[FormatDefinition]) -> Result<Self, TemplateError> {
        let templates = formats
            .iter()
            .map(|f| Template::parse(f.name.clone(), f.template.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(mode, templates))
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    /// Render a normalized entry.
    pub fn render(&self, entry: &LogEntry) -> Rendered {
        let json = entry.field(JSON_FIELD).unwrap_or_default();

        if self.mode == OutputMode::Json {
            return Rendered {
                text: json.to_string(),
                format: None,
            };
        }

        for template in &self.templates {
            match template.render(entry) {
                Ok(text) if !text.is_empty() => {
                    return Rendered {
                        text,
                        format: Some(template.name().to_string()),
                    };
                }
                Ok(_) => trace!(format = template.name(), id = %entry.id, "Format rendered empty"),
                Err(e) => trace!(format = template.name(), id = %entry.id, "Format skipped: {}", e),
            }
        }

        Rendered {
            text: format!("{} {}", NO_FORMAT_SENTINEL, json),
            format: None,
        }
    }
}
