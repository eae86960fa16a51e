//! Template parser.
//!
//! Splits the source into text and `{{ ... }}` actions, tokenizes each action
//! and validates helper calls so that rendering can only fail on undefined
//! fields.

use crate::error::TemplateError;
use crate::funcs::Function;
use crate::Context;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// A parsed template node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Action(Pipeline),
}

/// An argument or standalone value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// `.name`
    Field(String),
    /// `"literal"`
    Str(String),
    /// `42`
    Int(usize),
}

/// One stage of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Operand(Operand),
    /// `input` is `None` when the value is piped in from the previous stage.
    Call {
        function: Function,
        count: Option<usize>,
        input: Option<Operand>,
    },
}

/// Stages separated by `|`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
}

impl Pipeline {
    /// Field names referenced by this pipeline.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|cmd| match cmd {
            Command::Operand(Operand::Field(name)) => Some(name.as_str()),
            Command::Call {
                input: Some(Operand::Field(name)),
                ..
            } => Some(name.as_str()),
            _ => None,
        })
    }

    pub(crate) fn eval(&self, template: &str, ctx: &dyn Context) -> Result<String, TemplateError> {
        let mut current = String::new();
        for command in &self.commands {
            current = match command {
                Command::Operand(op) => resolve(template, op, ctx)?,
                Command::Call {
                    function,
                    count,
                    input,
                } => {
                    let value = match input {
                        Some(op) => resolve(template, op, ctx)?,
                        None => std::mem::take(&mut current),
                    };
                    function.apply(*count, &value)
                }
            };
        }
        Ok(current)
    }
}

fn resolve(template: &str, op: &Operand, ctx: &dyn Context) -> Result<String, TemplateError> {
    match op {
        Operand::Field(name) => ctx
            .lookup(name)
            .map(str::to_string)
            .ok_or_else(|| TemplateError::UndefinedField {
                template: template.to_string(),
                field: name.clone(),
            }),
        Operand::Str(s) => Ok(s.clone()),
        Operand::Int(n) => Ok(n.to_string()),
    }
}

/// Parse template source into nodes.
pub(crate) fn parse(name: &str, src: &str) -> Result<Vec<Node>, TemplateError> {
    let mut nodes = Vec::new();
    let mut pos = 0;
    let mut trim_leading = false;

    while pos < src.len() {
        let Some(rel) = src[pos..].find(OPEN) else {
            push_text(&mut nodes, &src[pos..], trim_leading, false);
            break;
        };
        let start = pos + rel;
        let mut body_start = start + OPEN.len();

        // `{{- ` trims whitespace before the action
        let trim_trailing = is_left_trim(&src[body_start..]);
        if trim_trailing {
            body_start += 1;
        }
        push_text(&mut nodes, &src[pos..start], trim_leading, trim_trailing);

        let end = find_close(src, body_start)
            .ok_or_else(|| TemplateError::parse(name, start, "unclosed action"))?;
        let mut body = &src[body_start..end];

        // ` -}}` trims whitespace after the action
        trim_leading = is_right_trim(body);
        if trim_leading {
            body = &body[..body.len() - 1];
        }

        let trimmed = body.trim();
        if !(trimmed.starts_with("/*") && trimmed.ends_with("*/")) {
            let pipeline = parse_pipeline(name, body, body_start)?;
            nodes.push(Node::Action(pipeline));
        }

        pos = end + CLOSE.len();
    }

    Ok(nodes)
}

fn push_text(nodes: &mut Vec<Node>, text: &str, trim_start: bool, trim_end: bool) {
    let mut text = text;
    if trim_start {
        text = text.trim_start();
    }
    if trim_end {
        text = text.trim_end();
    }
    if !text.is_empty() {
        nodes.push(Node::Text(text.to_string()));
    }
}

fn is_left_trim(rest: &str) -> bool {
    let mut chars = rest.chars();
    chars.next() == Some('-') && chars.next().is_some_and(char::is_whitespace)
}

fn is_right_trim(body: &str) -> bool {
    let Some(head) = body.strip_suffix('-') else {
        return false;
    };
    head.chars().last().is_some_and(char::is_whitespace)
}

/// Byte index of the `}}` closing the action opened before `from`,
/// ignoring braces inside string literals.
fn find_close(src: &str, from: usize) -> Option<usize> {
    let bytes = src.as_bytes();
    let mut i = from;
    let mut in_string = false;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if in_string => i += 1,
            b'"' => in_string = !in_string,
            b'}' if !in_string && bytes.get(i + 1) == Some(&b'}') => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Pipe,
    Ident(String),
    Operand(Operand),
}

fn is_field_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '@' | '-')
}

fn tokenize(name: &str, body: &str, base: usize) -> Result<Vec<(usize, Token)>, TemplateError> {
    let mut tokens = Vec::new();
    let mut chars = body.char_indices().peekable();

    while let Some(&(i, c)) = chars.peek() {
        let offset = base + i;
        if c.is_whitespace() {
            chars.next();
        } else if c == '|' {
            chars.next();
            tokens.push((offset, Token::Pipe));
        } else if c == '.' {
            chars.next();
            let mut field = String::new();
            while let Some(&(_, c)) = chars.peek() {
                if !is_field_char(c) {
                    break;
                }
                field.push(c);
                chars.next();
            }
            if field.is_empty() {
                return Err(TemplateError::parse(name, offset, "expected field name after '.'"));
            }
            tokens.push((offset, Token::Operand(Operand::Field(field))));
        } else if c == '"' {
            chars.next();
            let mut literal = String::new();
            let mut closed = false;
            while let Some((_, c)) = chars.next() {
                match c {
                    '"' => {
                        closed = true;
                        break;
                    }
                    '\\' => match chars.next() {
                        Some((_, 'n')) => literal.push('\n'),
                        Some((_, 't')) => literal.push('\t'),
                        Some((_, other)) => literal.push(other),
                        None => break,
                    },
                    other => literal.push(other),
                }
            }
            if !closed {
                return Err(TemplateError::parse(name, offset, "unterminated string literal"));
            }
            tokens.push((offset, Token::Operand(Operand::Str(literal))));
        } else if c.is_ascii_digit() {
            let mut digits = String::new();
            while let Some(&(_, c)) = chars.peek() {
                if !c.is_ascii_digit() {
                    break;
                }
                digits.push(c);
                chars.next();
            }
            let n = digits
                .parse::<usize>()
                .map_err(|e| TemplateError::parse(name, offset, format!("invalid number: {}", e)))?;
            tokens.push((offset, Token::Operand(Operand::Int(n))));
        } else if c.is_ascii_alphabetic() {
            let mut ident = String::new();
            while let Some(&(_, c)) = chars.peek() {
                if !(c.is_ascii_alphanumeric() || c == '_') {
                    break;
                }
                ident.push(c);
                chars.next();
            }
            tokens.push((offset, Token::Ident(ident)));
        } else {
            return Err(TemplateError::parse(
                name,
                offset,
                format!("unexpected character '{}'", c),
            ));
        }
    }

    Ok(tokens)
}

fn parse_pipeline(name: &str, body: &str, base: usize) -> Result<Pipeline, TemplateError> {
    let tokens = tokenize(name, body, base)?;
    if tokens.is_empty() {
        return Err(TemplateError::parse(name, base, "empty action"));
    }

    let mut groups: Vec<(usize, Vec<Token>)> = vec![(base, Vec::new())];
    for (offset, token) in tokens {
        if token == Token::Pipe {
            groups.push((offset, Vec::new()));
            continue;
        }
        if let Some(group) = groups.last_mut() {
            if group.1.is_empty() {
                group.0 = offset;
            }
            group.1.push(token);
        }
    }

    let mut commands = Vec::with_capacity(groups.len());
    for (index, (offset, group)) in groups.into_iter().enumerate() {
        let piped = index > 0;
        let mut group = group.into_iter();
        let command = match group.next() {
            None => return Err(TemplateError::parse(name, offset, "empty command in pipeline")),
            Some(Token::Ident(ident)) => {
                let function = Function::from_name(&ident).ok_or_else(|| {
                    TemplateError::UnknownFunction {
                        template: name.to_string(),
                        name: ident.clone(),
                    }
                })?;
                let mut args = Vec::new();
                for token in group {
                    match token {
                        Token::Operand(op) => args.push(op),
                        Token::Ident(other) => {
                            return Err(TemplateError::parse(
                                name,
                                offset,
                                format!("unexpected identifier '{}' in arguments to {}", other, ident),
                            ))
                        }
                        Token::Pipe => {}
                    }
                }
                build_call(name, function, args, piped)?
            }
            Some(Token::Operand(op)) => {
                if piped {
                    return Err(TemplateError::parse(name, offset, "cannot pipe into a value"));
                }
                if group.next().is_some() {
                    return Err(TemplateError::parse(name, offset, "unexpected token after value"));
                }
                Command::Operand(op)
            }
            Some(Token::Pipe) => {
                return Err(TemplateError::parse(name, offset, "empty command in pipeline"))
            }
        };
        commands.push(command);
    }

    Ok(Pipeline { commands })
}

fn build_call(
    template: &str,
    function: Function,
    args: Vec<Operand>,
    piped: bool,
) -> Result<Command, TemplateError> {
    let invalid = |message: String| TemplateError::InvalidArgument {
        template: template.to_string(),
        function: function.name().to_string(),
        message,
    };

    let given = args.len() + usize::from(piped);
    if given != function.arity() {
        return Err(invalid(format!(
            "expected {} argument(s), got {}",
            function.arity(),
            given
        )));
    }

    let mut args = args.into_iter();
    let count = if function.takes_count() {
        match args.next() {
            Some(Operand::Int(n)) => Some(n),
            _ => return Err(invalid("first argument must be an integer".to_string())),
        }
    } else {
        None
    };

    let input = match args.next() {
        Some(Operand::Int(_)) => return Err(invalid("expected a string argument".to_string())),
        other => other,
    };

    Ok(Command::Call {
        function,
        count,
        input,
    })
}
