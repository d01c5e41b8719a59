//! Display formatting for tool payloads.

const EMPTY_PAYLOAD: &str = "No data returned.";

/// Pretty-print a tool payload.
///
/// SQLite servers commonly return Python-literal rows (`[{'n': 1}]`), so a
/// second attempt is made after normalizing quotes and literals. Anything that
/// still does not parse is returned as-is.
pub fn format_tool_output(payload: &str) -> String {
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        return EMPTY_PAYLOAD.to_string();
    }

    if let Some(pretty) = pretty_json(trimmed) {
        return pretty;
    }

    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        if let Some(pretty) = pretty_json(&python_literal_to_json(trimmed)) {
            return pretty;
        }
    }

    trimmed.to_string()
}

fn pretty_json(raw: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    if !(value.is_array() || value.is_object()) {
        return None;
    }
    serde_json::to_string_pretty(&value).ok()
}

fn python_literal_to_json(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    let mut in_single = false;
    let mut in_double = false;

    while let Some(c) = chars.next() {
        match c {
            '\\' if in_single || in_double => {
                if let Some(next) = chars.next() {
                    if next == '\'' {
                        out.push('\'');
                    } else {
                        out.push('\\');
                        out.push(next);
                    }
                }
            }
            '\'' if !in_double => {
                in_single = !in_single;
                out.push('"');
            }
            '"' if in_single => out.push_str("\\\""),
            '"' => {
                in_double = !in_double;
                out.push('"');
            }
            '(' if !in_single && !in_double => out.push('['),
            ')' if !in_single && !in_double => out.push(']'),
            _ if !in_single && !in_double && c.is_ascii_alphabetic() => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push_str(match word.as_str() {
                    "None" => "null",
                    "True" => "true",
                    "False" => "false",
                    _ => &word,
                });
            }
            _ => out.push(c),
        }
    }
    out
}
