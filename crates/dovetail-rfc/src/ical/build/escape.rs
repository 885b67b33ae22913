//! Text escaping for serialization (RFC 5545 §3.3.11, RFC 6868).

/// Escapes a TEXT value: `\` `;` `,` and newlines.
#[must_use]
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

/// Encodes a parameter value, quoting and caret-escaping as needed.
///
/// Values containing `:` `;` `,` are quoted (RFC 5545 §3.2); embedded
/// quotes and newlines use RFC 6868 caret encoding.
#[must_use]
pub fn escape_param_value(s: &str) -> String {
    let needs_quoting = s.contains([':', ';', ',']) || s.contains('"') || s.contains('\n');
    if !needs_quoting {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '^' => out.push_str("^^"),
            '\n' => out.push_str("^n"),
            '"' => out.push_str("^'"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_escapes() {
        assert_eq!(escape_text("a,b;c\\d"), "a\\,b\\;c\\\\d");
        assert_eq!(escape_text("line1\nline2"), "line1\\nline2");
    }

    #[test]
    fn param_plain_value_unquoted() {
        assert_eq!(escape_param_value("WORK"), "WORK");
    }

    #[test]
    fn param_comma_value_quoted() {
        assert_eq!(escape_param_value("Doe, Jane"), "\"Doe, Jane\"");
    }

    #[test]
    fn param_quote_caret_encoded() {
        assert_eq!(escape_param_value("say \"hi\""), "\"say ^'hi^'\"");
    }
}
