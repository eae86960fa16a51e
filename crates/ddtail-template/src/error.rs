//! Template error types.

/// Errors raised while parsing or rendering a template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("template '{template}': parse error at byte {offset}: {message}")]
    Parse {
        template: String,
        offset: usize,
        message: String,
    },

    #[error("template '{template}': unknown function '{name}'")]
    UnknownFunction { template: String, name: String },

    #[error("template '{template}': {function}: {message}")]
    InvalidArgument {
        template: String,
        function: String,
        message: String,
    },

    #[error("template '{template}': field '{field}' is not defined")]
    UndefinedField { template: String, field: String },
}

impl TemplateError {
    /// True for the render-time miss that drives format fallback.
    pub fn is_undefined(&self) -> bool {
        matches!(self, TemplateError::UndefinedField { .. })
    }

    pub(crate) fn parse(template: &str, offset: usize, message: impl Into<String>) -> Self {
        TemplateError::Parse {
            template: template.to_string(),
            offset,
            message: message.into(),
        }
    }
}
