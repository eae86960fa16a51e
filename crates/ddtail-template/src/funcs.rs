//! Helper function registry.

/// The closed set of helpers callable from an action.
///
/// Every helper takes a string as its last argument (the piped value when
/// used after `|`). `trunc` and `pad` additionally take a leading count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Upper,
    Lower,
    Title,
    Trim,
    Trunc,
    Pad,
}

impl Function {
    pub const ALL: [Function; 6] = [
        Function::Upper,
        Function::Lower,
        Function::Title,
        Function::Trim,
        Function::Trunc,
        Function::Pad,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Function::Upper => "upper",
            Function::Lower => "lower",
            Function::Title => "title",
            Function::Trim => "trim",
            Function::Trunc => "trunc",
            Function::Pad => "pad",
        }
    }

    /// Whether the first argument is an integer count.
    pub fn takes_count(&self) -> bool {
        matches!(self, Function::Trunc | Function::Pad)
    }

    pub fn arity(&self) -> usize {
        if self.takes_count() {
            2
        } else {
            1
        }
    }

    pub(crate) fn apply(&self, count: Option<usize>, input: &str) -> String {
        let n = count.unwrap_or(0);
        match self {
            Function::Upper => input.to_uppercase(),
            Function::Lower => input.to_lowercase(),
            Function::Title => title_case(input),
            Function::Trim => input.trim().to_string(),
            Function::Trunc => input.chars().take(n).collect(),
            Function::Pad => {
                let len = input.chars().count();
                let mut out = input.to_string();
                out.extend(std::iter::repeat(' ').take(n.saturating_sub(len)));
                out
            }
        }
    }
}

/// Uppercase the first letter of every whitespace-separated word.
fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut at_word_start = true;
    for c in input.chars() {
        if c.is_whitespace() {
            at_word_start = true;
            out.push(c);
        } else if at_word_start {
            at_word_start = false;
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}
