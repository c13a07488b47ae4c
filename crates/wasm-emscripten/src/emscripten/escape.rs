//! Escaping of recovered asm-const code for the metadata record.

/// Escape inline JavaScript so it can sit inside a double-quoted field.
///
/// The two-character sequence `\n` becomes `\\n`. A bare `"` becomes `\"`;
/// a `"` that is already preceded by a backslash becomes `\\\"` so that the
/// existing backslash survives the loader's unescaping as well.
pub fn escape(input: &str) -> String {
    let code = input.replace("\\n", "\\\\n");

    let mut escaped = String::with_capacity(code.len());
    let mut prev = None;
    for c in code.chars() {
        if c == '"' {
            if prev == Some('\\') {
                escaped.push_str("\\\\\"");
            } else {
                escaped.push_str("\\\"");
            }
        } else {
            escaped.push(c);
        }
        prev = Some(c);
    }
    escaped
}
