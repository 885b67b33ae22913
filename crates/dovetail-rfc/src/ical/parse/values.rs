//! Value type parsers (RFC 5545 §3.3).

use super::error::{ParseError, ParseErrorKind, ParseResult};
use crate::ical::core::{
    Date, DateTime, DateTimeForm, Duration, Frequency, Period, RRule, RRuleUntil, Time, UtcOffset,
    Weekday, WeekdayNum,
};

fn err(kind: ParseErrorKind, line: usize, col: usize) -> ParseError {
    ParseError::new(kind, line, col)
}

/// Parses a DATE value: `YYYYMMDD`.
///
/// ## Errors
/// Returns an error unless the string is a valid 8-digit date.
pub fn parse_date(s: &str, line: usize, col: usize) -> ParseResult<Date> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err(ParseErrorKind::InvalidDate, line, col));
    }

    let year: u16 = s[0..4]
        .parse()
        .map_err(|_| err(ParseErrorKind::InvalidDate, line, col))?;
    let month: u8 = s[4..6]
        .parse()
        .map_err(|_| err(ParseErrorKind::InvalidDate, line, col))?;
    let day: u8 = s[6..8]
        .parse()
        .map_err(|_| err(ParseErrorKind::InvalidDate, line, col))?;

    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return Err(err(ParseErrorKind::InvalidDate, line, col));
    }

    Ok(Date { year, month, day })
}

/// Parses a TIME value: `HHMMSS[Z]`.
///
/// ## Errors
/// Returns an error unless the string is a valid 6-digit time.
pub fn parse_time(s: &str, line: usize, col: usize) -> ParseResult<Time> {
    let (digits, is_utc) = match s.strip_suffix('Z') {
        Some(stripped) => (stripped, true),
        None => (s, false),
    };

    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err(ParseErrorKind::InvalidTime, line, col));
    }

    let hour: u8 = digits[0..2]
        .parse()
        .map_err(|_| err(ParseErrorKind::InvalidTime, line, col))?;
    let minute: u8 = digits[2..4]
        .parse()
        .map_err(|_| err(ParseErrorKind::InvalidTime, line, col))?;
    let second: u8 = digits[4..6]
        .parse()
        .map_err(|_| err(ParseErrorKind::InvalidTime, line, col))?;

    // 60 allowed for leap seconds
    if hour > 23 || minute > 59 || second > 60 {
        return Err(err(ParseErrorKind::InvalidTime, line, col));
    }

    Ok(Time {
        hour,
        minute,
        second,
        is_utc,
    })
}

/// Parses a DATE-TIME value: `YYYYMMDD"T"HHMMSS[Z]`.
///
/// The TZID comes from the property parameter level, not the value.
///
/// ## Errors
/// Returns an error unless the string is a valid date-time.
pub fn parse_datetime(
    s: &str,
    tzid: Option<&str>,
    line: usize,
    col: usize,
) -> ParseResult<DateTime> {
    let t_pos = s
        .find('T')
        .ok_or_else(|| err(ParseErrorKind::InvalidDateTime, line, col))?;

    let date = parse_date(&s[..t_pos], line, col)?;
    let time = parse_time(&s[t_pos + 1..], line, col + t_pos + 1)?;

    let form = if time.is_utc {
        DateTimeForm::Utc
    } else if let Some(tz) = tzid {
        DateTimeForm::Zoned {
            tzid: tz.to_string(),
        }
    } else {
        DateTimeForm::Floating
    };

    Ok(DateTime {
        year: date.year,
        month: date.month,
        day: date.day,
        hour: time.hour,
        minute: time.minute,
        second: time.second,
        form,
    })
}

/// Parses a UTC-OFFSET value: `(+|-)HHMM[SS]`.
///
/// ## Errors
/// Returns an error unless the string is a valid offset.
pub fn parse_utc_offset(s: &str, line: usize, col: usize) -> ParseResult<UtcOffset> {
    let sign = match s.chars().next() {
        Some('+') => 1,
        Some('-') => -1,
        _ => return Err(err(ParseErrorKind::InvalidUtcOffset, line, col)),
    };

    if s.len() != 5 && s.len() != 7 {
        return Err(err(ParseErrorKind::InvalidUtcOffset, line, col));
    }

    let hours: i32 = s[1..3]
        .parse()
        .map_err(|_| err(ParseErrorKind::InvalidUtcOffset, line, col))?;
    let minutes: i32 = s[3..5]
        .parse()
        .map_err(|_| err(ParseErrorKind::InvalidUtcOffset, line, col))?;
    let seconds: i32 = if s.len() == 7 {
        s[5..7]
            .parse()
            .map_err(|_| err(ParseErrorKind::InvalidUtcOffset, line, col))?
    } else {
        0
    };

    Ok(UtcOffset::from_seconds(
        sign * (hours * 3600 + minutes * 60 + seconds),
    ))
}

/// Parses a DURATION value: `[+|-]P[nW]` or `[+|-]P[nD][T[nH][nM][nS]]`.
///
/// ## Errors
/// Returns an error unless the string is a valid duration.
pub fn parse_duration(s: &str, line: usize, col: usize) -> ParseResult<Duration> {
    let mut dur = Duration::zero();
    let mut rest = s;

    if let Some(stripped) = rest.strip_prefix('-') {
        dur.negative = true;
        rest = stripped;
    } else if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    } else {
        // No sign, positive duration
    }

    rest = rest
        .strip_prefix('P')
        .ok_or_else(|| err(ParseErrorKind::InvalidDuration, line, col))?;

    let mut in_time = false;
    let mut num: Option<u32> = None;
    let mut seen_any = false;

    for c in rest.chars() {
        match c {
            '0'..='9' => {
                let digit = u32::from(c as u8 - b'0');
                num = Some(
                    num.unwrap_or(0)
                        .checked_mul(10)
                        .and_then(|n| n.checked_add(digit))
                        .ok_or_else(|| err(ParseErrorKind::InvalidDuration, line, col))?,
                );
            }
            'T' if num.is_none() => in_time = true,
            'W' | 'D' | 'H' | 'M' | 'S' => {
                let n = num
                    .take()
                    .ok_or_else(|| err(ParseErrorKind::InvalidDuration, line, col))?;
                match (c, in_time) {
                    ('W', false) => dur.weeks = n,
                    ('D', false) => dur.days = n,
                    ('H', true) => dur.hours = n,
                    ('M', true) => dur.minutes = n,
                    ('S', true) => dur.seconds = n,
                    _ => return Err(err(ParseErrorKind::InvalidDuration, line, col)),
                }
                seen_any = true;
            }
            _ => return Err(err(ParseErrorKind::InvalidDuration, line, col)),
        }
    }

    if !seen_any || num.is_some() {
        return Err(err(ParseErrorKind::InvalidDuration, line, col));
    }

    Ok(dur)
}

/// Parses a PERIOD value: `start"/"end` or `start"/"duration`.
///
/// ## Errors
/// Returns an error unless the string is a valid period.
pub fn parse_period(s: &str, tzid: Option<&str>, line: usize, col: usize) -> ParseResult<Period> {
    let slash = s
        .find('/')
        .ok_or_else(|| err(ParseErrorKind::InvalidPeriod, line, col))?;

    let start = parse_datetime(&s[..slash], tzid, line, col)?;
    let tail = &s[slash + 1..];

    if tail.starts_with(['P', '+', '-']) {
        let duration = parse_duration(tail, line, col + slash + 1)?;
        Ok(Period::Duration { start, duration })
    } else {
        let end = parse_datetime(tail, tzid, line, col + slash + 1)?;
        Ok(Period::Explicit { start, end })
    }
}

/// Parses a RECUR (RRULE) value.
///
/// ## Errors
/// Returns an error on a malformed rule part or a COUNT/UNTIL conflict.
pub fn parse_rrule(s: &str, line: usize, col: usize) -> ParseResult<RRule> {
    let mut rule = RRule::new();

    for part in s.split(';') {
        let eq = part
            .find('=')
            .ok_or_else(|| err(ParseErrorKind::InvalidRRule, line, col))?;
        parse_rrule_part(&mut rule, &part[..eq], &part[eq + 1..], line, col)?;
    }

    Ok(rule)
}

fn parse_rrule_part(
    rule: &mut RRule,
    key: &str,
    value: &str,
    line: usize,
    col: usize,
) -> ParseResult<()> {
    match key.to_ascii_uppercase().as_str() {
        "FREQ" => {
            rule.freq = Some(
                Frequency::parse(value)
                    .ok_or_else(|| err(ParseErrorKind::InvalidFrequency, line, col))?,
            );
        }
        "INTERVAL" => {
            rule.interval = Some(
                value
                    .parse()
                    .map_err(|_| err(ParseErrorKind::InvalidRRule, line, col))?,
            );
        }
        "COUNT" => {
            if rule.until.is_some() {
                return Err(err(ParseErrorKind::UntilCountConflict, line, col));
            }
            rule.count = Some(
                value
                    .parse()
                    .map_err(|_| err(ParseErrorKind::InvalidRRule, line, col))?,
            );
        }
        "UNTIL" => {
            if rule.count.is_some() {
                return Err(err(ParseErrorKind::UntilCountConflict, line, col));
            }
            rule.until = Some(if value.contains('T') {
                RRuleUntil::DateTime(parse_datetime(value, None, line, col)?)
            } else {
                RRuleUntil::Date(parse_date(value, line, col)?)
            });
        }
        "WKST" => {
            rule.wkst = Some(
                Weekday::parse(value)
                    .ok_or_else(|| err(ParseErrorKind::InvalidWeekday, line, col))?,
            );
        }
        "BYSECOND" => rule.by_second = parse_num_list(value, line, col)?,
        "BYMINUTE" => rule.by_minute = parse_num_list(value, line, col)?,
        "BYHOUR" => rule.by_hour = parse_num_list(value, line, col)?,
        "BYDAY" => rule.by_day = parse_byday(value, line, col)?,
        "BYMONTHDAY" => rule.by_monthday = parse_num_list(value, line, col)?,
        "BYYEARDAY" => rule.by_yearday = parse_num_list(value, line, col)?,
        "BYWEEKNO" => rule.by_weekno = parse_num_list(value, line, col)?,
        "BYMONTH" => rule.by_month = parse_num_list(value, line, col)?,
        "BYSETPOS" => rule.by_setpos = parse_num_list(value, line, col)?,
        // Unknown rule parts are ignored
        _ => {}
    }
    Ok(())
}

/// Parses a comma-separated numeric list of any integer type.
fn parse_num_list<T: std::str::FromStr>(
    s: &str,
    line: usize,
    col: usize,
) -> ParseResult<Vec<T>> {
    s.split(',')
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|_| err(ParseErrorKind::InvalidRRule, line, col))
        })
        .collect()
}

fn parse_byday(s: &str, line: usize, col: usize) -> ParseResult<Vec<WeekdayNum>> {
    s.split(',')
        .map(|v| parse_weekday_num(v.trim(), line, col))
        .collect()
}

/// Parses one BYDAY token: `MO`, `2MO`, `-1FR`.
fn parse_weekday_num(s: &str, line: usize, col: usize) -> ParseResult<WeekdayNum> {
    if s.len() < 2 {
        return Err(err(ParseErrorKind::InvalidWeekday, line, col));
    }

    let (ordinal_str, weekday_str) = s.split_at(s.len() - 2);

    let weekday = Weekday::parse(weekday_str)
        .ok_or_else(|| err(ParseErrorKind::InvalidWeekday, line, col))?;

    let ordinal = if ordinal_str.is_empty() {
        None
    } else {
        Some(
            ordinal_str
                .parse()
                .map_err(|_| err(ParseErrorKind::InvalidRRule, line, col))?,
        )
    };

    Ok(WeekdayNum { ordinal, weekday })
}

/// Unescapes TEXT values (RFC 5545 §3.3.11): `\\` `\,` `\;` `\n` `\N`.
#[must_use]
pub fn unescape_text(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => result.push('\n'),
            Some(',') => result.push(','),
            Some(';') => result.push(';'),
            Some('\\') | None => result.push('\\'),
            Some(other) => {
                // Unknown escape, keep verbatim
                result.push('\\');
                result.push(other);
            }
        }
    }

    result
}

/// Parses a BOOLEAN value.
///
/// ## Errors
/// Returns an error unless the string is `TRUE` or `FALSE`.
pub fn parse_boolean(s: &str, line: usize, col: usize) -> ParseResult<bool> {
    match s.to_ascii_uppercase().as_str() {
        "TRUE" => Ok(true),
        "FALSE" => Ok(false),
        _ => Err(err(ParseErrorKind::InvalidBoolean, line, col)),
    }
}

/// Parses an INTEGER value.
///
/// ## Errors
/// Returns an error unless the string is a valid i32.
pub fn parse_integer(s: &str, line: usize, col: usize) -> ParseResult<i32> {
    s.parse()
        .map_err(|_| err(ParseErrorKind::InvalidInteger, line, col))
}

/// Parses a FLOAT value.
///
/// ## Errors
/// Returns an error unless the string is a valid f64.
pub fn parse_float(s: &str, line: usize, col: usize) -> ParseResult<f64> {
    s.parse()
        .map_err(|_| err(ParseErrorKind::InvalidFloat, line, col))
}
