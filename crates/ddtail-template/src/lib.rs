//! Strict-undefined text templates over flat string maps.
//!
//! A template is literal text interleaved with `{{ ... }}` actions. An action
//! is a pipeline of field references, literals and a closed set of helper
//! functions:
//!
//! ```text
//! {{._long_time_timestamp}} {{._level | pad 5}} {{.service | upper}}: {{._message_text}}
//! ```
//!
//! Referencing a field the context does not contain is a render error rather
//! than an empty substitution. Callers rely on this to try several templates
//! in order and keep the first whose fields are all present.

mod error;
mod funcs;
mod parser;

pub use error::TemplateError;
pub use funcs::Function;
pub use parser::{Command, Node, Operand, Pipeline};

use std::collections::{BTreeMap, HashMap};

/// Source of field values for rendering.
pub trait Context {
    /// Look up a field by name. `None` means the field is undefined.
    fn lookup(&self, key: &str) -> Option<&str>;
}

impl Context for BTreeMap<String, String> {
    fn lookup(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

impl Context for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

impl<C: Context + ?Sized> Context for &C {
    fn lookup(&self, key: &str) -> Option<&str> {
        (**self).lookup(key)
    }
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    name: String,
    source: String,
    nodes: Vec<Node>,
}

impl Template {
    /// Parse a template. Syntax errors, unknown functions and argument
    /// count/type mismatches are all reported here rather than at render time.
    pub fn parse(name: impl Into<String>, source: impl Into<String>) -> Result<Self, TemplateError> {
        let name = name.into();
        let source = source.into();
        let nodes = parser::parse(&name, &source)?;
        Ok(Self {
            name,
            source,
            nodes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field names referenced anywhere in the template, in order of first use.
    pub fn fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::new();
        for node in &self.nodes {
            if let Node::Action(pipeline) = node {
                for name in pipeline.fields() {
                    if !fields.contains(&name) {
                        fields.push(name);
                    }
                }
            }
        }
        fields
    }

    /// Render against a context.
    pub fn render(&self, ctx: &dyn Context) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.source.len());
        for node in &self.nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Action(pipeline) => out.push_str(&pipeline.eval(&self.name, ctx)?),
            }
        }
        Ok(out)
    }
}
