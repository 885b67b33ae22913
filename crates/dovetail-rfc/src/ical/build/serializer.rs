//! Document serializer (RFC 5545).
//!
//! Writes components and properties in insertion order. Values serialize
//! from their typed form; `Unknown` values round-trip their raw text.

use super::escape::{escape_param_value, escape_text};
use super::fold::fold_line;
use crate::ical::core::{Component, ICalendar, Property, Value};

/// Serializes a complete iCalendar document with CRLF line endings.
#[must_use]
pub fn serialize(ical: &ICalendar) -> String {
    let mut out = String::new();
    serialize_component(&ical.root, &mut out);
    out
}

/// Serializes one component (recursively) into `out`.
pub fn serialize_component(component: &Component, out: &mut String) {
    push_line(out, &format!("BEGIN:{}", component.name));

    for prop in &component.properties {
        out.push_str(&serialize_property(prop));
    }
    for child in &component.children {
        serialize_component(child, out);
    }

    push_line(out, &format!("END:{}", component.name));
}

/// Serializes one property as a folded content line with CRLF.
#[must_use]
pub fn serialize_property(prop: &Property) -> String {
    let mut line = prop.name.clone();

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
    line.push_str(&value_text(prop));

    let mut folded = fold_line(&line);
    folded.push_str("\r\n");
    folded
}

/// Returns the wire text for a property value.
fn value_text(prop: &Property) -> String {
    match &prop.value {
        Value::Text(s) => escape_text(s),
        Value::Integer(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Boolean(v) => if *v { "TRUE" } else { "FALSE" }.to_string(),
        Value::DateTime(dt) => dt.to_string(),
        Value::Date(d) => d.to_string(),
        Value::Time(t) => t.to_string(),
        Value::Duration(d) => d.to_string(),
        Value::Period(p) => p.to_string(),
        Value::UtcOffset(o) => o.to_string(),
        Value::Uri(u) => u.clone(),
        Value::Recur(r) => r.to_string(),
        Value::Binary(b) => {
            use base64::{Engine, engine::general_purpose::STANDARD};
            STANDARD.encode(b)
        }
        Value::DateTimeList(list) => list
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::DateList(list) => list
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::PeriodList(list) => list
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Unknown(raw) => raw.clone(),
    }
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(&fold_line(line));
    out.push_str("\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ical::core::{DateTime, Property};
    use crate::ical::parse::parse;

    #[test]
    fn serialize_minimal_event() {
        let mut ical = ICalendar::new("-//Test//Test//EN");
        let mut event = Component::event();
        event.add_property(Property::text("UID", "u1@example.com"));
        event.add_property(Property::datetime(
            "DTSTART",
            DateTime::utc(2026, 3, 7, 9, 0, 0),
        ));
        ical.add_component(event);

        let text = serialize(&ical);
        assert!(text.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(text.contains("DTSTART:20260307T090000Z\r\n"));
        assert!(text.ends_with("END:VCALENDAR\r\n"));
    }

    #[test]
    fn text_value_is_escaped() {
        let prop = Property::text("SUMMARY", "Lunch, with; friends");
        assert_eq!(
            serialize_property(&prop),
            "SUMMARY:Lunch\\, with\\; friends\r\n"
        );
    }

    #[test]
    fn param_with_comma_is_quoted() {
        let mut prop = Property::uri("ATTENDEE", "mailto:jane@example.com");
        prop.add_param(crate::ical::core::Parameter::new("CN", "Doe, Jane"));
        let line = serialize_property(&prop);
        assert!(line.contains("CN=\"Doe, Jane\""));
    }

    #[test]
    fn parse_serialize_parse_round_trip() {
        let input = "\
BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//Test//Test//EN\r\n\
BEGIN:VEVENT\r\n\
UID:rt@example.com\r\n\
DTSTAMP:20260123T120000Z\r\n\
DTSTART;TZID=Europe/Berlin:20260123T090000\r\n\
RRULE:FREQ=WEEKLY;BYDAY=MO,WE,FR;COUNT=10\r\n\
SUMMARY:Escaped\\, text\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        let first = parse(input).unwrap();
        let text = serialize(&first);
        let second = parse(&text).unwrap();

        assert_eq!(first.events().len(), second.events().len());
        assert_eq!(
            first.events()[0].summary(),
            second.events()[0].summary()
        );
        assert_eq!(
            first.events()[0].dtstart().unwrap().tzid(),
            second.events()[0].dtstart().unwrap().tzid()
        );
    }

    #[test]
    fn long_description_folds() {
        let prop = Property::text("DESCRIPTION", "A".repeat(200));
        let line = serialize_property(&prop);
        for part in line.trim_end().split("\r\n") {
            assert!(part.len() <= 75);
        }
    }
}
