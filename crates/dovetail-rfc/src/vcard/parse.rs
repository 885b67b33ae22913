//! vCard parser (RFC 2426 §2.1).

use thiserror::Error;

use super::card::{Vcard, VcardProperty};
use crate::ical::parse::{ParseError, parse_content_line, split_lines};

/// Errors from vCard parsing.
#[derive(Debug, Error)]
pub enum VcardParseError {
    #[error("missing BEGIN:VCARD")]
    MissingBegin,

    #[error("missing END:VCARD")]
    MissingEnd,

    #[error(transparent)]
    Line(#[from] ParseError),
}

/// Parses a single vCard from wire text.
///
/// The content-line grammar is shared with iCalendar; on top of it this
/// handles the `group.NAME` prefix. BEGIN/END/VERSION lines are consumed
/// and not stored as properties.
///
/// ## Errors
/// Returns an error on malformed lines or missing BEGIN/END framing.
#[tracing::instrument(skip(input), fields(input_len = input.len()))]
pub fn parse(input: &str) -> Result<Vcard, VcardParseError> {
    let lines = split_lines(input);
    let mut card = Vcard::new();
    let mut in_card = false;
    let mut ended = false;

    for (line_num, line) in lines {
        let cl = parse_content_line(&line, line_num)?;

        let (group, name) = match cl.name.split_once('.') {
            Some((group, name)) => (Some(group.to_string()), name.to_string()),
            None => (None, cl.name.clone()),
        };

        match name.as_str() {
            "BEGIN" if cl.raw_value.eq_ignore_ascii_case("VCARD") => in_card = true,
            "END" if cl.raw_value.eq_ignore_ascii_case("VCARD") => {
                ended = true;
                break;
            }
            "VERSION" => {}
            _ if in_card => {
                card.add_property(VcardProperty {
                    group,
                    name,
                    params: cl.params,
                    value: cl.raw_value,
                });
            }
            _ => return Err(VcardParseError::MissingBegin),
        }
    }

    if !in_card {
        return Err(VcardParseError::MissingBegin);
    }
    if !ended {
        return Err(VcardParseError::MissingEnd);
    }

    Ok(card)
}
