//! Text cleanup helpers.

const NESTED_EXCEPTION: &str = "; nested exception ";
const NESTED_EXCEPTION_BREAK: &str = ";\nnested exception ";

/// Expand literal escape sequences the backend leaves in string values.
pub fn unescape(value: &str) -> String {
    if !value.contains('\\') {
        return value.to_string();
    }
    value
        .replace("\\\"", "\"")
        .replace("\\n", "\n")
        .replace("\\r", "\r")
        .replace("\\t", "\t")
}

/// Last `.`-separated segment of a qualified class name.
pub fn short_classname(classname: &str) -> &str {
    classname.rsplit('.').next().unwrap_or(classname)
}

/// Prefix a request path with `/` when it lacks one.
pub fn normalize_request_path(path: &str) -> Option<String> {
    if path.len() > 1 && !path.starts_with('/') {
        Some(format!("/{}", path))
    } else {
        None
    }
}

/// Best message text from the short and full message values.
///
/// The short message wins; the full message is the fallback. When both are
/// present, differ, and the full message spans several lines, its lines after
/// the first are appended (trailing blank lines dropped). Chained
/// `; nested exception ` causes are broken onto their own lines.
pub fn message_text(message: Option<&str>, full_message: Option<&str>) -> String {
    let full = full_message.unwrap_or("");
    let base = match message {
        Some(m) if !m.is_empty() => m,
        _ => full,
    };

    let mut text = base.replace(NESTED_EXCEPTION, NESTED_EXCEPTION_BREAK);

    if !full.is_empty() && base != full {
        let mut extra: Vec<&str> = full.lines().skip(1).collect();
        while extra.last().is_some_and(|l| l.trim().is_empty()) {
            extra.pop();
        }
        if !extra.is_empty() {
            text.push('\n');
            text.push_str(&extra.join("\n"));
        }
    }

    text
}
