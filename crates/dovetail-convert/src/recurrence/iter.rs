//! Occurrence enumeration.
//!
//! A lazy, finite, restartable walk over the dates a descriptor
//! generates, shared by both translation directions: count⇄end-date
//! interconversion, UNTIL snapping, and exception placement validation
//! all run through here. Raw pattern dates are generated first;
//! deletions are skipped from the yield but still count toward an
//! `AfterCount` bound, and modifications substitute their own times at
//! the original slot.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use super::descriptor::{PatternFrequency, RecurrenceDescriptor, RecurrenceEnd, WeekNumber};
use crate::timezone::{TimezoneRule, days_in_month};

/// One concrete occurrence of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    /// Midnight of the original local occurrence date, stamped as UTC;
    /// the stable key correlating exceptions with their slot.
    pub base_date: DateTime<Utc>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub is_modified: bool,
}

/// Iterator over the raw pattern dates of a descriptor, ignoring
/// deletions, modifications, and end bounds. The building block the
/// public iterator and the interconversion helpers share.
pub(crate) struct PatternDates<'a> {
    desc: &'a RecurrenceDescriptor,
    cursor: NaiveDate,
    remaining_steps: u32,
}

impl<'a> PatternDates<'a> {
    pub(crate) fn new(desc: &'a RecurrenceDescriptor, from: NaiveDate, cap: u32) -> Self {
        Self {
            desc,
            cursor: from.max(desc.start_date.date()),
            remaining_steps: cap,
        }
    }

    /// First pattern date on or after `from`.
    fn next_pattern_date(&self, from: NaiveDate) -> Option<NaiveDate> {
        let interval = i64::from(self.desc.interval.max(1));
        let anchor = self.desc.start_date.date();

        match self.desc.frequency {
            PatternFrequency::Daily => {
                let delta = (from - anchor).num_days();
                if delta <= 0 {
                    return Some(anchor);
                }
                let k = delta.div_euclid(interval)
                    + i64::from(delta.rem_euclid(interval) != 0);
                anchor.checked_add_signed(Duration::days(k * interval))
            }
            PatternFrequency::Weekly => {
                let fdow = self.desc.first_day_of_week.number();
                let anchor_week = week_start(anchor, fdow);
                let mut day = from;
                // A qualifying day is at most interval+1 weeks out
                for _ in 0..=(7 * (interval + 1)) {
                    let bit = 1u8 << day.weekday().num_days_from_sunday();
                    let weeks = (week_start(day, fdow) - anchor_week).num_days() / 7;
                    if self.desc.week_days & bit != 0 && weeks.rem_euclid(interval) == 0 {
                        return Some(day);
                    }
                    day = day.succ_opt()?;
                }
                None
            }
            PatternFrequency::Monthly => {
                // A yearly nth-weekday pattern rides the monthly code on
                // a 12-month grid; its anchor month is the pattern month,
                // not the series start month.
                let anchor_idx = if self.desc.month == 0 {
                    month_index(anchor)
                } else {
                    i64::from(anchor.year()) * 12 + i64::from(self.desc.month) - 1
                };
                let mut idx = month_index(from).max(anchor_idx);
                // Align to the interval grid
                let misalign = (idx - anchor_idx).rem_euclid(interval);
                if misalign != 0 {
                    idx += interval - misalign;
                }
                for _ in 0..48 {
                    if let Some(date) = self.date_in_month(idx)
                        && date >= from
                    {
                        return Some(date);
                    }
                    idx += interval;
                }
                None
            }
            PatternFrequency::Yearly => {
                let anchor_year = i64::from(anchor.year());
                let month = if self.desc.month == 0 {
                    #[expect(clippy::cast_possible_truncation, reason = "month is 1..=12")]
                    let m = anchor.month() as u8;
                    m
                } else {
                    self.desc.month
                };
                let mut year = i64::from(from.year()).max(anchor_year);
                let misalign = (year - anchor_year).rem_euclid(interval);
                if misalign != 0 {
                    year += interval - misalign;
                }
                for _ in 0..8 {
                    let idx = year * 12 + i64::from(month) - 1;
                    if let Some(date) = self.date_in_month(idx)
                        && date >= from
                    {
                        return Some(date);
                    }
                    year += interval;
                }
                None
            }
        }
    }

    /// The pattern day within an absolute month index, if representable.
    fn date_in_month(&self, month_idx: i64) -> Option<NaiveDate> {
        let year = i32::try_from(month_idx.div_euclid(12)).ok()?;
        #[expect(clippy::cast_possible_truncation, reason = "rem_euclid(12) fits u8")]
        let month = (month_idx.rem_euclid(12) + 1) as u8;

        if let Some(week) = self.desc.week_number {
            return nth_matching_weekday(year, month, self.desc.week_days, week);
        }

        let day = u32::from(self.desc.day_of_month.max(1)).min(days_in_month(year, month));
        NaiveDate::from_ymd_opt(year, u32::from(month), day)
    }
}

impl Iterator for PatternDates<'_> {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        if self.remaining_steps == 0 {
            return None;
        }
        self.remaining_steps -= 1;

        let date = self.next_pattern_date(self.cursor)?;
        self.cursor = date.succ_opt()?;
        Some(date)
    }
}

/// The public occurrence iterator over `[from, to]` (local dates).
pub struct OccurrenceIter<'a> {
    desc: &'a RecurrenceDescriptor,
    tz: &'a TimezoneRule,
    dates: PatternDates<'a>,
    from: NaiveDate,
    to: NaiveDate,
    raw_emitted: u32,
}

impl<'a> OccurrenceIter<'a> {
    /// Creates an iterator over occurrences whose local date falls in
    /// `[from, to]`. `cap` bounds the total work for runaway rules.
    #[must_use]
    pub fn new(
        desc: &'a RecurrenceDescriptor,
        tz: &'a TimezoneRule,
        from: NaiveDate,
        to: NaiveDate,
        cap: u32,
    ) -> Self {
        // Count-bounded series must count raw occurrences from the very
        // start of the pattern, not from the window edge.
        let scan_from = if matches!(desc.end, RecurrenceEnd::AfterCount(_)) {
            desc.start_date.date()
        } else {
            from.max(desc.start_date.date())
        };
        Self {
            desc,
            tz,
            dates: PatternDates::new(desc, scan_from, cap),
            from,
            to,
            raw_emitted: 0,
        }
    }

    fn make_occurrence(&self, date: NaiveDate) -> Occurrence {
        let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
        let base_date = DateTime::from_naive_utc_and_offset(midnight, Utc);

        if let Some(modified) = self.desc.modified_on(date) {
            return Occurrence {
                base_date,
                start: self.tz.local_to_utc(modified.start),
                end: self.tz.local_to_utc(modified.end),
                is_modified: true,
            };
        }

        let start_local =
            midnight + Duration::minutes(i64::from(self.desc.start_time_offset_minutes));
        let end_local = midnight + Duration::minutes(i64::from(self.desc.end_time_offset_minutes));
        Occurrence {
            base_date,
            start: self.tz.local_to_utc(start_local),
            end: self.tz.local_to_utc(end_local),
            is_modified: false,
        }
    }
}

impl Iterator for OccurrenceIter<'_> {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Occurrence> {
        loop {
            if let RecurrenceEnd::AfterCount(n) = self.desc.end
                && self.raw_emitted >= n
            {
                return None;
            }

            let date = self.dates.next()?;
            if date > self.to {
                return None;
            }
            if let RecurrenceEnd::OnDate(end) = self.desc.end
                && date > end.date()
            {
                return None;
            }

            self.raw_emitted += 1;

            // Deleted occurrences stay counted but are not yielded; so
            // do raw occurrences before the requested window.
            if self.desc.is_deleted_on(date) || date < self.from {
                continue;
            }

            return Some(self.make_occurrence(date));
        }
    }
}

/// Whether exactly one raw occurrence falls within the day window
/// `[date 00:00, date+1 00:00)`; the exception placement check.
#[must_use]
pub(crate) fn occurs_on_day(desc: &RecurrenceDescriptor, date: NaiveDate, cap: u32) -> bool {
    if date < desc.start_date.date() {
        return false;
    }
    match desc.end {
        RecurrenceEnd::OnDate(end) if date > end.date() => return false,
        RecurrenceEnd::AfterCount(n) => {
            // The date must be among the first n raw pattern dates
            return PatternDates::new(desc, desc.start_date.date(), cap)
                .take(n as usize)
                .any(|d| d == date);
        }
        _ => {}
    }
    PatternDates::new(desc, date, cap)
        .next()
        .is_some_and(|d| d == date)
}

/// Absolute month index (year * 12 + month0).
fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month()) - 1
}

/// Start of the week containing `date` for a Sunday-based first day.
fn week_start(date: NaiveDate, first_day: u8) -> NaiveDate {
    let back = (7 + date.weekday().num_days_from_sunday() - u32::from(first_day)) % 7;
    date - Duration::days(i64::from(back))
}

/// The `week`-th day of the month whose weekday bit is in `mask`
/// (`Last` selects the final match).
fn nth_matching_weekday(
    year: i32,
    month: u8,
    mask: u8,
    week: WeekNumber,
) -> Option<NaiveDate> {
    let total_days = days_in_month(year, month);
    let matches = (1..=total_days).filter_map(|day| {
        let date = NaiveDate::from_ymd_opt(year, u32::from(month), day)?;
        let bit = 1u8 << date.weekday().num_days_from_sunday();
        (mask & bit != 0).then_some(date)
    });

    match week {
        WeekNumber::Last => matches.last(),
        nth => matches.into_iter().nth(usize::from(nth.index()) - 1),
    }
}
