//! RRULE → store descriptor translation (the parse direction).
//!
//! Reproduces the store's narrowing rules deliberately: the pattern
//! space downstream is smaller than RFC 5545's, and several shapes are
//! narrowed to the nearest representable pattern instead of rejected so
//! that widely-deployed clients keep working. Each narrowing is logged.

use chrono::{Datelike, NaiveDateTime, Timelike};
use dovetail_core::{ConvertError, ConvertResult};
use dovetail_rfc::ical::core::{
    Component, Frequency, Property, RRule, RRuleUntil, Value, Weekday,
};

use super::descriptor::{
    NEVER_DISPLAY_COUNT, PatternFrequency, RecurrenceDescriptor, RecurrenceEnd, WeekNumber,
    never_end_date, weekday_bit,
};
use super::iter::PatternDates;
use crate::timezone::TimezoneRule;

/// Translates a component's RRULE (plus DTSTART/DTEND/DUE/DURATION and
/// EXDATE) into the store-native descriptor.
///
/// `cap` bounds occurrence enumeration during count⇄end-date
/// interconversion.
///
/// ## Errors
/// - `NotFound` if DTSTART, the end-time source, or the RRULE is missing
/// - `CorruptData` if a mandatory property failed value parsing
/// - `Unsupported` for recognized but unrepresentable patterns
#[tracing::instrument(skip(component, tz), fields(uid = component.uid().unwrap_or("?")))]
pub fn rrule_to_descriptor(
    component: &Component,
    tz: &TimezoneRule,
    cap: u32,
) -> ConvertResult<RecurrenceDescriptor> {
    let rrule = component
        .get_property("RRULE")
        .ok_or_else(|| ConvertError::NotFound("RRULE".to_string()))?
        .value
        .as_recur()
        .ok_or_else(|| ConvertError::CorruptData("RRULE value unparseable".to_string()))?;

    let dtstart = component
        .get_property("DTSTART")
        .ok_or_else(|| ConvertError::NotFound("DTSTART".to_string()))?;
    let start_local = local_datetime(dtstart, tz)?;

    let duration_minutes = item_duration_minutes(component, tz, start_local)?;

    let start_offset = i64::from(start_local.hour()) * 60 + i64::from(start_local.minute());
    let start_date = start_local
        .date()
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| ConvertError::InvalidArgument("start date out of range".to_string()))?;

    let mut desc = build_pattern(rrule, start_local)?;
    desc.start_date = start_date;
    desc.start_time_offset_minutes = clamp_offset(start_offset);
    desc.end_time_offset_minutes = clamp_offset(start_offset + duration_minutes.max(0));

    apply_end_condition(&mut desc, rrule, tz, cap);
    collect_deleted_occurrences(&mut desc, component, tz, start_offset);

    desc.summary = desc.pattern_summary();
    Ok(desc)
}

/// Maps the RFC frequency and BY-parts onto the store pattern space
/// (spec §4.3 steps 2-3).
fn build_pattern(rrule: &RRule, start_local: NaiveDateTime) -> ConvertResult<RecurrenceDescriptor> {
    let freq = rrule
        .freq
        .ok_or_else(|| ConvertError::CorruptData("RRULE without FREQ".to_string()))?;

    let start_date = start_local
        .date()
        .and_hms_opt(0, 0, 0)
        .unwrap_or(start_local);
    let start_weekday = Weekday::from_chrono(start_local.weekday());
    let interval = rrule.effective_interval();

    let mut desc = match freq {
        Frequency::Secondly | Frequency::Minutely | Frequency::Hourly => {
            return Err(ConvertError::Unsupported(format!(
                "sub-daily frequency {freq}"
            )));
        }

        Frequency::Daily => {
            if rrule.by_day.is_empty() {
                let mut d = RecurrenceDescriptor::new(PatternFrequency::Daily, start_date);
                d.interval = interval;
                d
            } else {
                // "Every weekday" is written FREQ=DAILY;BYDAY=MO..FR by
                // several clients; the store pattern for it is weekly.
                tracing::debug!("daily rule with BYDAY treated as weekly");
                let mut d = RecurrenceDescriptor::new(PatternFrequency::Weekly, start_date);
                d.interval = interval;
                d.week_days = byday_bits(rrule);
                d
            }
        }

        Frequency::Weekly => {
            let mut d = RecurrenceDescriptor::new(PatternFrequency::Weekly, start_date);
            d.interval = interval;
            d.week_days = if rrule.by_day.is_empty() {
                // No BYDAY: the start date's weekday carries the pattern
                weekday_bit(start_weekday)
            } else {
                byday_bits(rrule)
            };
            d
        }

        Frequency::Monthly => build_monthly(rrule, start_local, interval)?,

        Frequency::Yearly => build_yearly(rrule, start_local, interval)?,
    };

    if let Some(wkst) = rrule.wkst {
        desc.first_day_of_week = wkst;
    }

    Ok(desc)
}

fn build_monthly(
    rrule: &RRule,
    start_local: NaiveDateTime,
    interval: u32,
) -> ConvertResult<RecurrenceDescriptor> {
    let start_date = start_local
        .date()
        .and_hms_opt(0, 0, 0)
        .unwrap_or(start_local);

    if rrule.by_day.is_empty() {
        let mut d = RecurrenceDescriptor::new(PatternFrequency::Monthly, start_date);
        d.interval = interval;
        d.day_of_month = monthday_or_start(rrule, start_local)?;
        return Ok(d);
    }

    match positioned_week(rrule)? {
        Some(week) => {
            let mut d = RecurrenceDescriptor::new(PatternFrequency::Monthly, start_date);
            d.interval = interval;
            d.week_number = Some(week);
            d.week_days = byday_bits(rrule);
            Ok(d)
        }
        None => {
            // Monthly weekday without a position is not representable
            // downstream; narrowed to a weekly rule on those weekdays.
            // Intentional client-compatibility behavior.
            tracing::warn!("monthly BYDAY without position narrowed to weekly");
            let mut d = RecurrenceDescriptor::new(PatternFrequency::Weekly, start_date);
            d.interval = interval;
            d.week_days = byday_bits(rrule);
            Ok(d)
        }
    }
}

fn build_yearly(
    rrule: &RRule,
    start_local: NaiveDateTime,
    interval: u32,
) -> ConvertResult<RecurrenceDescriptor> {
    let start_date = start_local
        .date()
        .and_hms_opt(0, 0, 0)
        .unwrap_or(start_local);
    #[expect(clippy::cast_possible_truncation, reason = "month is 1..=12")]
    let month = rrule
        .by_month
        .first()
        .copied()
        .unwrap_or(start_local.month() as u8);

    if rrule.by_day.is_empty() {
        let mut d = RecurrenceDescriptor::new(PatternFrequency::Yearly, start_date);
        d.interval = interval;
        d.month = month;
        d.day_of_month = monthday_or_start(rrule, start_local)?;
        return Ok(d);
    }

    match positioned_week(rrule)? {
        Some(week) => {
            // The store expresses "nth weekday of a month every N years"
            // as a monthly pattern on a 12-month grid; weekday bits stay
            // a weekly/monthly-only concept.
            let mut d = RecurrenceDescriptor::new(PatternFrequency::Monthly, start_date);
            d.interval = interval.saturating_mul(12);
            d.week_number = Some(week);
            d.week_days = byday_bits(rrule);
            d.month = month;
            Ok(d)
        }
        // The yearly analogue of the monthly narrowing is rejected
        None => Err(ConvertError::Unsupported(
            "yearly BYDAY without position".to_string(),
        )),
    }
}

/// Extracts the week-in-month position from BYDAY ordinals or BYSETPOS.
///
/// ## Errors
/// `Unsupported` for ordinals outside 1..=4/-1.
fn positioned_week(rrule: &RRule) -> ConvertResult<Option<WeekNumber>> {
    if let Some(ordinal) = rrule.by_day.iter().find_map(|wd| wd.ordinal) {
        return WeekNumber::from_ordinal(ordinal)
            .map(Some)
            .ok_or_else(|| ConvertError::Unsupported(format!("BYDAY ordinal {ordinal}")));
    }

    if let Some(&pos) = rrule.by_setpos.first() {
        let ordinal = i8::try_from(pos)
            .map_err(|_| ConvertError::Unsupported(format!("BYSETPOS {pos}")))?;
        return WeekNumber::from_ordinal(ordinal)
            .map(Some)
            .ok_or_else(|| ConvertError::Unsupported(format!("BYSETPOS {pos}")));
    }

    Ok(None)
}

fn byday_bits(rrule: &RRule) -> u8 {
    rrule
        .by_day
        .iter()
        .fold(0u8, |bits, wd| bits | weekday_bit(wd.weekday))
}

/// First positive BYMONTHDAY, or the start date's day.
fn monthday_or_start(rrule: &RRule, start_local: NaiveDateTime) -> ConvertResult<u8> {
    match rrule.by_monthday.first() {
        Some(&day) if day > 0 => u8::try_from(day)
            .map_err(|_| ConvertError::Unsupported(format!("BYMONTHDAY {day}"))),
        Some(&day) => Err(ConvertError::Unsupported(format!("BYMONTHDAY {day}"))),
        None => {
            #[expect(clippy::cast_possible_truncation, reason = "day of month fits u8")]
            let day = start_local.day() as u8;
            Ok(day)
        }
    }
}

/// Applies COUNT/UNTIL (spec §4.3 steps 4 and 6): whichever bound the
/// rule carries, the other form is derived exactly by enumeration, and
/// UNTIL is snapped to the last actual occurrence.
fn apply_end_condition(desc: &mut RecurrenceDescriptor, rrule: &RRule, tz: &TimezoneRule, cap: u32) {
    let start_offset = i64::from(desc.start_time_offset_minutes);

    if let Some(n) = rrule.count {
        desc.end = RecurrenceEnd::AfterCount(n);
        desc.count = n;
        let last = PatternDates::new(desc, desc.start_date.date(), cap)
            .take(n.min(cap) as usize)
            .last();
        desc.end_date = last.map_or_else(never_end_date, |d| {
            d.and_hms_opt(0, 0, 0).unwrap_or_default() + chrono::Duration::minutes(start_offset)
        });
        return;
    }

    if let Some(until) = &rrule.until {
        let until_local = match until {
            RRuleUntil::Date(d) => d
                .to_naive()
                .and_then(|d| d.and_hms_opt(23, 59, 59))
                .unwrap_or_else(never_end_date),
            RRuleUntil::DateTime(dt) => {
                let naive = dt.to_naive().unwrap_or_else(never_end_date);
                if dt.is_utc() {
                    tz.utc_to_local(chrono::DateTime::from_naive_utc_and_offset(
                        naive,
                        chrono::Utc,
                    ))
                } else {
                    naive
                }
            }
        };

        // UNTIL may fall between occurrences: count the raw occurrences
        // up to it and snap the stored end to the last actual one.
        let mut count = 0u32;
        let mut last = None;
        for date in PatternDates::new(desc, desc.start_date.date(), cap) {
            if date > until_local.date() {
                break;
            }
            count += 1;
            last = Some(date);
        }

        desc.count = count;
        let snapped = last.map_or(desc.start_date, |d| {
            d.and_hms_opt(0, 0, 0).unwrap_or_default() + chrono::Duration::minutes(start_offset)
        });
        desc.end_date = snapped;
        desc.end = RecurrenceEnd::OnDate(snapped);
        return;
    }

    desc.end = RecurrenceEnd::Never;
    desc.count = NEVER_DISPLAY_COUNT;
    desc.end_date = never_end_date();
}

/// Collects EXDATE entries as local deleted-occurrence starts
/// (spec §4.3 step 5).
fn collect_deleted_occurrences(
    desc: &mut RecurrenceDescriptor,
    component: &Component,
    tz: &TimezoneRule,
    start_offset: i64,
) {
    for prop in component.get_properties("EXDATE") {
        let locals: Vec<NaiveDateTime> = match &prop.value {
            Value::DateTime(dt) => vec![wire_datetime_to_local(dt, tz)],
            Value::DateTimeList(list) => {
                list.iter().map(|dt| wire_datetime_to_local(dt, tz)).collect()
            }
            Value::Date(d) => d
                .to_naive()
                .map(|n| {
                    vec![
                        n.and_hms_opt(0, 0, 0).unwrap_or_default()
                            + chrono::Duration::minutes(start_offset),
                    ]
                })
                .unwrap_or_default(),
            Value::DateList(list) => list
                .iter()
                .filter_map(|d| d.to_naive())
                .map(|n| {
                    n.and_hms_opt(0, 0, 0).unwrap_or_default()
                        + chrono::Duration::minutes(start_offset)
                })
                .collect(),
            other => {
                tracing::warn!(value = ?other, "EXDATE with unexpected value type skipped");
                Vec::new()
            }
        };
        desc.deleted_occurrences.extend(locals);
    }
    desc.deleted_occurrences.sort_unstable();
    desc.deleted_occurrences.dedup();
}

/// Converts a wire DATE-TIME to series-local wall clock.
fn wire_datetime_to_local(
    dt: &dovetail_rfc::ical::core::DateTime,
    tz: &TimezoneRule,
) -> NaiveDateTime {
    let naive = dt.to_naive().unwrap_or_default();
    if dt.is_utc() {
        tz.utc_to_local(chrono::DateTime::from_naive_utc_and_offset(naive, chrono::Utc))
    } else {
        // Zoned values are wall clock in the series timezone; floating
        // values are taken as-is
        naive
    }
}

/// Resolves a DTSTART/DTEND/DUE property to local wall-clock time.
///
/// ## Errors
/// `CorruptData` if the value failed parsing upstream.
pub(crate) fn local_datetime(prop: &Property, tz: &TimezoneRule) -> ConvertResult<NaiveDateTime> {
    match &prop.value {
        Value::DateTime(dt) => Ok(wire_datetime_to_local(dt, tz)),
        Value::Date(d) => d
            .to_naive()
            .and_then(|n| n.and_hms_opt(0, 0, 0))
            .ok_or_else(|| ConvertError::CorruptData(format!("{} date out of range", prop.name))),
        _ => Err(ConvertError::CorruptData(format!(
            "{} is not a date or date-time",
            prop.name
        ))),
    }
}

/// Duration of one occurrence in minutes, from DTEND/DUE or DURATION
/// (spec §4.3 step 1).
fn item_duration_minutes(
    component: &Component,
    tz: &TimezoneRule,
    start_local: NaiveDateTime,
) -> ConvertResult<i64> {
    if let Some(end_prop) = component
        .get_property("DTEND")
        .or_else(|| component.get_property("DUE"))
    {
        let end_local = local_datetime(end_prop, tz)?;
        return Ok((end_local - start_local).num_minutes());
    }

    if let Some(duration) = component
        .get_property("DURATION")
        .and_then(Property::as_duration)
    {
        return Ok(duration.total_minutes());
    }

    Err(ConvertError::NotFound(
        "DTEND, DUE or DURATION".to_string(),
    ))
}

fn clamp_offset(minutes: i64) -> u32 {
    u32::try_from(minutes.max(0)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dovetail_rfc::ical::parse::parse;

    const CAP: u32 = 10_000;

    fn event_with(rrule: &str, extra: &str) -> Component {
        let input = format!(
            "BEGIN:VCALENDAR\r\n\
             VERSION:2.0\r\n\
             PRODID:-//Test//Test//EN\r\n\
             BEGIN:VEVENT\r\n\
             UID:r@example.com\r\n\
             DTSTAMP:20260302T120000Z\r\n\
             DTSTART:20260302T090000Z\r\n\
             DTEND:20260302T100000Z\r\n\
             RRULE:{rrule}\r\n\
             {extra}SUMMARY:Recurring\r\n\
             END:VEVENT\r\n\
             END:VCALENDAR\r\n"
        );
        let ical = parse(&input).unwrap();
        ical.events()[0].clone()
    }

    #[test]
    fn weekly_byday_count_scenario() {
        // 2026-03-02 is a Monday
        let event = event_with("FREQ=WEEKLY;BYDAY=MO,WE,FR;COUNT=5", "");
        let tz = TimezoneRule::utc();
        let desc = rrule_to_descriptor(&event, &tz, CAP).unwrap();

        assert_eq!(desc.frequency, PatternFrequency::Weekly);
        // Su=bit 0: Monday, Wednesday, Friday
        assert_eq!(desc.week_days, 0b0010_1010);
        assert_eq!(desc.end, RecurrenceEnd::AfterCount(5));
        assert_eq!(desc.count, 5);
        // Fifth matching weekday after the Monday start: Mon 2, Wed 4,
        // Fri 6, Mon 9, Wed 11
        assert_eq!(desc.end_date.date().to_string(), "2026-03-11");
        assert_eq!(desc.first_day_of_week, Weekday::Monday);
    }

    #[test]
    fn monthly_last_friday_scenario() {
        let event = event_with("FREQ=MONTHLY;BYDAY=-1FR", "");
        let tz = TimezoneRule::utc();
        let desc = rrule_to_descriptor(&event, &tz, CAP).unwrap();

        assert_eq!(desc.frequency, PatternFrequency::Monthly);
        assert_eq!(desc.week_number, Some(WeekNumber::Last));
        assert_eq!(desc.week_days, weekday_bit(Weekday::Friday));
    }

    #[test]
    fn weekly_without_byday_uses_start_weekday() {
        let event = event_with("FREQ=WEEKLY;COUNT=3", "");
        let tz = TimezoneRule::utc();
        let desc = rrule_to_descriptor(&event, &tz, CAP).unwrap();
        assert_eq!(desc.week_days, weekday_bit(Weekday::Monday));
    }

    #[test]
    fn daily_with_byday_becomes_weekly() {
        let event = event_with("FREQ=DAILY;BYDAY=MO,TU,WE,TH,FR;COUNT=10", "");
        let tz = TimezoneRule::utc();
        let desc = rrule_to_descriptor(&event, &tz, CAP).unwrap();
        assert_eq!(desc.frequency, PatternFrequency::Weekly);
        assert_eq!(desc.week_days, 0b0011_1110);
    }

    #[test]
    fn monthly_unpositioned_weekday_narrows_to_weekly() {
        let event = event_with("FREQ=MONTHLY;BYDAY=MO;COUNT=4", "");
        let tz = TimezoneRule::utc();
        let desc = rrule_to_descriptor(&event, &tz, CAP).unwrap();
        assert_eq!(desc.frequency, PatternFrequency::Weekly);
        assert_eq!(desc.week_days, weekday_bit(Weekday::Monday));
    }

    #[test]
    fn monthly_bysetpos_maps_to_week_number() {
        let event = event_with("FREQ=MONTHLY;BYDAY=MO;BYSETPOS=2;COUNT=4", "");
        let tz = TimezoneRule::utc();
        let desc = rrule_to_descriptor(&event, &tz, CAP).unwrap();
        assert_eq!(desc.frequency, PatternFrequency::Monthly);
        assert_eq!(desc.week_number, Some(WeekNumber::Second));
    }

    #[test]
    fn yearly_unpositioned_weekday_rejected() {
        let event = event_with("FREQ=YEARLY;BYMONTH=6;BYDAY=MO", "");
        let tz = TimezoneRule::utc();
        let err = rrule_to_descriptor(&event, &tz, CAP).unwrap_err();
        assert!(matches!(err, ConvertError::Unsupported(_)));
    }

    #[test]
    fn yearly_positioned_weekday_lands_on_month_grid() {
        let event = event_with("FREQ=YEARLY;BYMONTH=6;BYDAY=2MO;COUNT=3", "");
        let tz = TimezoneRule::utc();
        let desc = rrule_to_descriptor(&event, &tz, CAP).unwrap();
        assert_eq!(desc.frequency, PatternFrequency::Monthly);
        assert_eq!(desc.interval, 12);
        assert_eq!(desc.month, 6);
        assert_eq!(desc.week_number, Some(WeekNumber::Second));
    }

    #[test]
    fn sub_daily_rejected() {
        let event = event_with("FREQ=HOURLY;COUNT=4", "");
        let tz = TimezoneRule::utc();
        assert!(matches!(
            rrule_to_descriptor(&event, &tz, CAP),
            Err(ConvertError::Unsupported(_))
        ));
    }

    #[test]
    fn until_snaps_to_last_occurrence() {
        // Weekly Mondays; UNTIL on a Saturday between occurrences
        let event = event_with("FREQ=WEEKLY;BYDAY=MO;UNTIL=20260321T000000Z", "");
        let tz = TimezoneRule::utc();
        let desc = rrule_to_descriptor(&event, &tz, CAP).unwrap();
        // Mondays: Mar 2, 9, 16 (Mar 21 is Saturday)
        assert_eq!(desc.count, 3);
        assert_eq!(desc.end_date.date().to_string(), "2026-03-16");
        assert!(matches!(desc.end, RecurrenceEnd::OnDate(_)));
    }

    #[test]
    fn never_gets_display_sentinels() {
        let event = event_with("FREQ=DAILY", "");
        let tz = TimezoneRule::utc();
        let desc = rrule_to_descriptor(&event, &tz, CAP).unwrap();
        assert_eq!(desc.end, RecurrenceEnd::Never);
        assert_eq!(desc.count, NEVER_DISPLAY_COUNT);
        assert_eq!(desc.end_date, never_end_date());
    }

    #[test]
    fn exdate_converted_to_local_deleted() {
        let event = event_with(
            "FREQ=DAILY;COUNT=10",
            "EXDATE:20260304T090000Z,20260306T090000Z\r\n",
        );
        let tz = TimezoneRule::utc();
        let desc = rrule_to_descriptor(&event, &tz, CAP).unwrap();
        assert_eq!(desc.deleted_occurrences.len(), 2);
        assert_eq!(desc.deleted_occurrences[0].date().to_string(), "2026-03-04");
    }

    #[test]
    fn missing_end_source_is_not_found() {
        let input = "\
BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//Test//Test//EN\r\n\
BEGIN:VEVENT\r\n\
UID:noend@example.com\r\n\
DTSTAMP:20260302T120000Z\r\n\
DTSTART:20260302T090000Z\r\n\
RRULE:FREQ=DAILY;COUNT=3\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";
        let ical = parse(input).unwrap();
        let tz = TimezoneRule::utc();
        let err = rrule_to_descriptor(&ical.events()[0], &tz, CAP).unwrap_err();
        assert!(matches!(err, ConvertError::NotFound(_)));
    }

    #[test]
    fn count_end_date_mutually_rederivable() {
        let event = event_with("FREQ=DAILY;COUNT=7", "");
        let tz = TimezoneRule::utc();
        let desc = rrule_to_descriptor(&event, &tz, CAP).unwrap();
        // Daily from Mar 2, 7 occurrences ends Mar 8
        assert_eq!(desc.end_date.date().to_string(), "2026-03-08");
        // And its start-of-day time carries the start offset
        assert_eq!(desc.end_date.hour(), 9);
    }
}
