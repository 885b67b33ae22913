//! Content line folding (RFC 5545 §3.1).

/// Maximum octets per line, excluding CRLF.
const MAX_LINE_OCTETS: usize = 75;

/// Folds a content line at 75 octets, continuation lines prefixed with a
/// single space. Splits only at character boundaries so multi-byte UTF-8
/// sequences are never cut.
#[must_use]
pub fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }

    let mut out = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut budget = MAX_LINE_OCTETS;
    let mut used = 0;

    for c in line.chars() {
        let w = c.len_utf8();
        if used + w > budget {
            out.push_str("\r\n ");
            // Continuation lines lose one octet to the leading space
            budget = MAX_LINE_OCTETS - 1;
            used = 0;
        }
        out.push(c);
        used += w;
    }

    out
}
