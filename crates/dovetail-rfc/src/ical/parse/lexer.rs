//! Content line lexer (RFC 5545 §3.1).
//!
//! Splits wire text into unfolded content lines and tokenizes each line
//! into name, parameters, and raw value. Shared by the vCard layer, which
//! uses the same content-line grammar (RFC 2426 §2.1).

use super::error::{ParseError, ParseErrorKind, ParseResult};
use crate::ical::core::{ContentLine, Parameter};

/// Splits input into content lines, merging folded continuations.
///
/// Per RFC 5545 §3.1 a fold is CRLF followed by one SP/HTAB; unfolding
/// removes both without inserting anything. Bare LF is accepted for
/// lenient parsing, and a line without a `:` separator is treated as a
/// continuation of the previous line (some producers fold without the
/// leading whitespace).
///
/// Returns `(line_number, unfolded_line)` pairs, 1-based.
#[must_use]
pub fn split_lines(input: &str) -> Vec<(usize, String)> {
    let mut lines: Vec<(usize, String)> = Vec::new();

    for (i, raw_line) in input.lines().enumerate() {
        let line = raw_line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }

        let continuation = if line.starts_with([' ', '\t']) {
            Some(&line[1..])
        } else if line.contains(':') {
            None
        } else {
            // Lenient: no colon means this cannot start a content line.
            Some(line)
        };

        match (continuation, lines.last_mut()) {
            (Some(cont), Some((_, prev))) => prev.push_str(cont),
            (Some(cont), None) => lines.push((i + 1, cont.to_string())),
            (None, _) => lines.push((i + 1, line.to_string())),
        }
    }

    lines
}

/// Parses a single content line: `name *(";" param) ":" value`.
///
/// ## Errors
/// Returns an error if the line is malformed.
pub fn parse_content_line(line: &str, line_num: usize) -> ParseResult<ContentLine> {
    let mut chars = line.char_indices().peekable();

    // Property name runs until ';' or ':'.
    let mut name_end = 0;
    let mut at_colon = false;
    while let Some(&(i, c)) = chars.peek() {
        if c == ';' || c == ':' {
            name_end = i;
            at_colon = c == ':';
            break;
        }
        if !c.is_ascii_alphanumeric() && c != '-' && c != '.' {
            return Err(ParseError::new(
                ParseErrorKind::InvalidPropertyName,
                line_num,
                i + 1,
            ));
        }
        chars.next();
    }

    if name_end == 0 {
        return Err(ParseError::new(
            ParseErrorKind::MissingPropertyName,
            line_num,
            1,
        ));
    }

    let name = line[..name_end].to_ascii_uppercase();
    chars.next(); // consume the ';' or ':'

    let mut params = Vec::new();
    if !at_colon {
        loop {
            let (param, next_is_colon) = parse_parameter(&mut chars, line, line_num)?;
            params.push(param);
            if next_is_colon {
                break;
            }
        }
    }

    // Everything after the colon is the value; the parameter loop leaves
    // the iterator positioned just past it.
    let value_start = chars.peek().map_or(line.len(), |&(i, _)| i);
    let value = &line[value_start..];

    Ok(ContentLine {
        name,
        params,
        raw_value: value.to_string(),
    })
}

/// Parses one parameter; returns it and whether a ':' terminated it.
fn parse_parameter(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    line: &str,
    line_num: usize,
) -> ParseResult<(Parameter, bool)> {
    let start = chars.peek().map_or(line.len(), |&(i, _)| i);

    // Parameter name runs until '='.
    let mut name_end = start;
    while let Some(&(i, c)) = chars.peek() {
        if c == '=' {
            name_end = i;
            chars.next();
            break;
        }
        if !c.is_ascii_alphanumeric() && c != '-' {
            return Err(ParseError::new(
                ParseErrorKind::InvalidParameter,
                line_num,
                i + 1,
            ));
        }
        chars.next();
    }

    if name_end == start {
        return Err(ParseError::new(
            ParseErrorKind::InvalidParameter,
            line_num,
            start + 1,
        ));
    }

    let name = line[start..name_end].to_ascii_uppercase();

    // Comma-separated values, possibly quoted.
    let mut values = Vec::new();
    loop {
        values.push(parse_param_value(chars, line, line_num)?);

        match chars.peek() {
            Some(&(_, ',')) => {
                chars.next();
            }
            Some(&(_, ';')) => {
                chars.next();
                return Ok((Parameter::with_values(name, values), false));
            }
            Some(&(_, ':')) => {
                chars.next();
                return Ok((Parameter::with_values(name, values), true));
            }
            Some(&(i, c)) => {
                return Err(
                    ParseError::new(ParseErrorKind::InvalidParameter, line_num, i + 1)
                        .with_context(format!("unexpected character '{c}'")),
                );
            }
            None => {
                return Err(ParseError::new(
                    ParseErrorKind::MissingColon,
                    line_num,
                    line.len(),
                ));
            }
        }
    }
}

/// Parses a parameter value, decoding RFC 6868 caret escapes in quoted
/// values.
fn parse_param_value(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    line: &str,
    line_num: usize,
) -> ParseResult<String> {
    let Some(&(start, first)) = chars.peek() else {
        return Err(ParseError::new(
            ParseErrorKind::InvalidParameter,
            line_num,
            line.len(),
        ));
    };

    if first != '"' {
        // Unquoted value runs until ',' ';' or ':'.
        let mut end = start;
        while let Some(&(i, c)) = chars.peek() {
            if c == ',' || c == ';' || c == ':' {
                break;
            }
            end = i + c.len_utf8();
            chars.next();
        }
        return Ok(line[start..end].to_string());
    }

    chars.next(); // opening quote
    let mut value = String::new();
    let mut closed = false;

    while let Some((_, c)) = chars.next() {
        if c == '"' {
            closed = true;
            break;
        }
        if c == '^' {
            // RFC 6868: ^^ -> '^', ^n -> newline, ^' -> '"'
            match chars.peek().map(|&(_, n)| n) {
                Some('^') => {
                    value.push('^');
                    chars.next();
                }
                Some('n') => {
                    value.push('\n');
                    chars.next();
                }
                Some('\'') => {
                    value.push('"');
                    chars.next();
                }
                _ => value.push('^'),
            }
        } else {
            value.push(c);
        }
    }

    if !closed {
        return Err(ParseError::new(
            ParseErrorKind::UnclosedQuote,
            line_num,
            start + 1,
        ));
    }

    Ok(value)
}
