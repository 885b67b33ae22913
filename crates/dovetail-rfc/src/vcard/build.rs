//! vCard serializer (RFC 2426).

use super::card::Vcard;
use crate::ical::build::{escape_param_value, fold_line};

/// Serializes a vCard 3.0 document with CRLF line endings.
#[must_use]
pub fn serialize(card: &Vcard) -> String {
    let mut out = String::new();
    push_line(&mut out, "BEGIN:VCARD");
    push_line(&mut out, "VERSION:3.0");

    for prop in &card.properties {
        let mut line = String::new();
        if let Some(group) = &prop.group {
            line.push_str(group);
            line.push('.');
        }
        line.push_str(&prop.name);
        for param in &prop.params {
            line.push(';');
            line.push_str(&param.name);
            line.push('=');
            let values: Vec<String> = param
                .values
                .iter()
                .map(|v| escape_param_value(v))
                .collect();
            line.push_str(&values.join(","));
        }
        line.push(':');
        // Structured values arrive pre-escaped from their to_value()
        // builders; plain values are stored wire-ready.
        line.push_str(&prop.value);
        push_line(&mut out, &line);
    }

    push_line(&mut out, "END:VCARD");
    out
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(&fold_line(line));
    out.push_str("\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcard::card::VcardProperty;
    use crate::vcard::parse;

    #[test]
    fn serialize_and_reparse() {
        let mut card = Vcard::new();
        card.add_property(VcardProperty::new("FN", "Jane Doe"));
        card.add_property(VcardProperty::new("N", "Doe;Jane;;;"));

        let text = serialize(&card);
        assert!(text.starts_with("BEGIN:VCARD\r\nVERSION:3.0\r\n"));

        let parsed = parse(&text).unwrap();
        assert_eq!(parsed.formatted_name(), Some("Jane Doe"));
        assert_eq!(parsed.structured_name().unwrap().family, "Doe");
    }
}
