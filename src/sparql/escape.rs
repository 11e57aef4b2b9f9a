//! Literal escaping for SPARQL string literals.

/// Escape a value for embedding between quotes in a SPARQL string literal.
///
/// Handles the ECHAR set of the SPARQL grammar: backslash, both quote
/// characters, tab, line feed, carriage return, backspace and form feed.
/// URIs are never passed through here; callers embed them as-is.
pub fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + value.len() / 8);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            other => out.push(other),
        }
    }
    out
}
