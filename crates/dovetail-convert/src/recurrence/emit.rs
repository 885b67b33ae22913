//! Store descriptor → RRULE translation (the emit direction).
//!
//! The exact inverse of the parse mapping: weekday bitmasks become BYDAY
//! tokens (single positioned weekday as an ordinal prefix, multiple as a
//! BYDAY list plus BYSETPOS, sign flipped for "last"), the 12-month grid
//! becomes FREQ=YEARLY again, and deleted occurrences surface as EXDATE
//! values. Modified occurrences are never emitted inline; the caller
//! produces them as separate exception components.

use chrono::{DateTime, Utc};
use dovetail_core::{ConvertError, ConvertResult};
use dovetail_rfc::ical::core::{
    DateTime as IcalDateTime, Frequency, RRule, RRuleUntil, Weekday, WeekdayNum,
};

use super::descriptor::{PatternFrequency, RecurrenceDescriptor, RecurrenceEnd};
use crate::timezone::TimezoneRule;

/// Translates a descriptor back into a wire recurrence rule.
///
/// ## Errors
/// `InvalidObject` if the descriptor violates its own invariants (e.g. a
/// weekday pattern without weekday bits).
pub fn descriptor_to_rrule(
    desc: &RecurrenceDescriptor,
    tz: &TimezoneRule,
) -> ConvertResult<RRule> {
    let mut rrule = RRule::new();

    match desc.frequency {
        PatternFrequency::Daily => {
            rrule.freq = Some(Frequency::Daily);
            rrule.interval = Some(desc.interval);
        }
        PatternFrequency::Weekly => {
            rrule.freq = Some(Frequency::Weekly);
            rrule.interval = Some(desc.interval);
            rrule.by_day = plain_weekdays(desc.week_days)?;
            if desc.first_day_of_week != Weekday::Monday {
                rrule.wkst = Some(desc.first_day_of_week);
            }
        }
        PatternFrequency::Monthly if desc.month != 0 && desc.interval % 12 == 0 => {
            // The 12-month grid round-trips to a yearly rule
            rrule.freq = Some(Frequency::Yearly);
            rrule.interval = Some((desc.interval / 12).max(1));
            rrule.by_month = vec![desc.month];
            apply_month_pattern(&mut rrule, desc)?;
        }
        PatternFrequency::Monthly => {
            rrule.freq = Some(Frequency::Monthly);
            rrule.interval = Some(desc.interval);
            apply_month_pattern(&mut rrule, desc)?;
        }
        PatternFrequency::Yearly => {
            rrule.freq = Some(Frequency::Yearly);
            rrule.interval = Some(desc.interval);
            if desc.month != 0 {
                rrule.by_month = vec![desc.month];
            }
            rrule.by_monthday = vec![monthday(desc)?];
        }
    }

    if desc.frequency != PatternFrequency::Weekly && desc.first_day_of_week != Weekday::Sunday {
        rrule.wkst = Some(desc.first_day_of_week);
    }

    match desc.end {
        RecurrenceEnd::AfterCount(n) => rrule.count = Some(n),
        RecurrenceEnd::OnDate(local_end) => {
            let utc = tz.local_to_utc(local_end);
            rrule.until = Some(RRuleUntil::DateTime(IcalDateTime::from_utc(utc)));
        }
        RecurrenceEnd::Never => {}
    }

    Ok(rrule)
}

/// UTC instants of the deleted occurrences, for EXDATE emission.
#[must_use]
pub fn deleted_occurrence_utcs(
    desc: &RecurrenceDescriptor,
    tz: &TimezoneRule,
) -> Vec<DateTime<Utc>> {
    desc.deleted_occurrences
        .iter()
        .map(|local| tz.local_to_utc(*local))
        .collect()
}

/// Applies the monthly pattern body: a positioned weekday shape or a
/// fixed day of month.
fn apply_month_pattern(rrule: &mut RRule, desc: &RecurrenceDescriptor) -> ConvertResult<()> {
    if let Some(week) = desc.week_number {
        let days = set_weekdays(desc.week_days)?;
        let ordinal = week.byday_ordinal();
        if days.len() == 1 {
            // Single weekday: the ordinal rides on the BYDAY token
            rrule.by_day = vec![WeekdayNum {
                ordinal: Some(ordinal),
                weekday: days[0],
            }];
        } else {
            // Multiple weekdays: plain tokens positioned via BYSETPOS
            rrule.by_day = plain_weekdays(desc.week_days)?;
            rrule.by_setpos = vec![i16::from(ordinal)];
        }
    } else {
        rrule.by_monthday = vec![monthday(desc)?];
    }
    Ok(())
}

fn monthday(desc: &RecurrenceDescriptor) -> ConvertResult<i8> {
    if desc.day_of_month == 0 || desc.day_of_month > 31 {
        return Err(ConvertError::InvalidObject(format!(
            "day of month {} out of range",
            desc.day_of_month
        )));
    }
    i8::try_from(desc.day_of_month)
        .map_err(|_| ConvertError::InvalidObject("day of month overflow".to_string()))
}

/// Weekdays set in the bitmask, ascending from Sunday.
fn set_weekdays(mask: u8) -> ConvertResult<Vec<Weekday>> {
    if mask == 0 {
        return Err(ConvertError::InvalidObject(
            "weekday pattern without weekday bits".to_string(),
        ));
    }
    Ok((0..7u8)
        .filter(|bit| mask & (1 << bit) != 0)
        .map(Weekday::from_number)
        .collect())
}

fn plain_weekdays(mask: u8) -> ConvertResult<Vec<WeekdayNum>> {
    Ok(set_weekdays(mask)?
        .into_iter()
        .map(|weekday| WeekdayNum {
            ordinal: None,
            weekday,
        })
        .collect())
}
