//! Store-native recurrence descriptor.

use chrono::{NaiveDate, NaiveDateTime};
use dovetail_rfc::ical::core::Weekday;

/// Pattern frequency the store can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternFrequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl PatternFrequency {
    /// Stable wire code used by the recurrence-state blobs.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Daily => 0,
            Self::Weekly => 1,
            Self::Monthly => 2,
            Self::Yearly => 3,
        }
    }

    /// Inverse of [`PatternFrequency::code`].
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Daily),
            1 => Some(Self::Weekly),
            2 => Some(Self::Monthly),
            3 => Some(Self::Yearly),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

/// Week-in-month selector for monthly/yearly weekday patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeekNumber {
    First,
    Second,
    Third,
    Fourth,
    Last,
}

impl WeekNumber {
    /// 1-based index; `Last` is 5, matching the transition-rule
    /// convention.
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
            Self::Third => 3,
            Self::Fourth => 4,
            Self::Last => 5,
        }
    }

    #[must_use]
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            1 => Some(Self::First),
            2 => Some(Self::Second),
            3 => Some(Self::Third),
            4 => Some(Self::Fourth),
            5 => Some(Self::Last),
            _ => None,
        }
    }

    /// The signed BYDAY ordinal: 1..=4, or -1 for `Last`.
    #[must_use]
    pub const fn byday_ordinal(self) -> i8 {
        match self {
            Self::Last => -1,
            _ => self.index() as i8,
        }
    }

    /// Builds from a signed BYDAY/BYSETPOS ordinal.
    #[must_use]
    pub const fn from_ordinal(ordinal: i8) -> Option<Self> {
        match ordinal {
            1 => Some(Self::First),
            2 => Some(Self::Second),
            3 => Some(Self::Third),
            4 => Some(Self::Fourth),
            -1 => Some(Self::Last),
            _ => None,
        }
    }
}

/// How a series ends.
///
/// `AfterCount` and `OnDate` are mutually exclusive; whichever is chosen,
/// the descriptor also carries the other form (`count` / `end_date`) so
/// either can be read without re-deriving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurrenceEnd {
    Never,
    AfterCount(u32),
    /// Local date-time of the last occurrence's start.
    OnDate(NaiveDateTime),
}

impl RecurrenceEnd {
    /// Stable wire code used by the recurrence-state blobs.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Never => 0,
            Self::AfterCount(_) => 1,
            Self::OnDate(_) => 2,
        }
    }
}

/// Display count used for never-ending series; clients show "10" in the
/// end-condition UI without treating it as a bound.
pub const NEVER_DISPLAY_COUNT: u32 = 10;

/// Conventional end-date sentinel for never-ending series.
#[must_use]
pub fn never_end_date() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(4500, 12, 31)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Bit for a weekday in the `week_days` mask, Sunday = bit 0.
#[must_use]
pub const fn weekday_bit(weekday: Weekday) -> u8 {
    1 << weekday.number()
}

/// Per-occurrence override flags for modified occurrences.
pub mod overrides {
    pub const SUBJECT: u16 = 0x0001;
    pub const LOCATION: u16 = 0x0002;
    pub const BODY: u16 = 0x0004;
    pub const LABEL: u16 = 0x0008;
    pub const REMINDER_DELTA: u16 = 0x0010;
    pub const REMINDER_SET: u16 = 0x0020;
    pub const ALL_DAY: u16 = 0x0040;
    pub const BUSY_STATUS: u16 = 0x0080;
    pub const START: u16 = 0x0100;
    pub const END: u16 = 0x0200;
}

/// One modified occurrence within a series.
///
/// All times are local wall-clock in the series timezone. `base` is the
/// start of the original occurrence this modification replaces; `start`
/// and `end` are the (possibly moved) actual times.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModifiedOccurrence {
    pub base: NaiveDateTime,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Which fields below actually override the base item.
    pub override_flags: u16,
    pub subject: Option<String>,
    pub location: Option<String>,
    pub reminder_delta: Option<u32>,
    pub reminder_set: Option<bool>,
    pub all_day: Option<bool>,
    pub busy_status: Option<i32>,
}

/// The store-native recurrence pattern.
///
/// Invariants maintained by the parse direction:
/// - `week_days` is empty unless `frequency` is Weekly or Monthly
/// - `count` and `end_date` are both populated regardless of `end`, and
///   are exact interconversions of one another given the timezone
#[derive(Debug, Clone, PartialEq)]
pub struct RecurrenceDescriptor {
    pub frequency: PatternFrequency,
    pub interval: u32,
    /// Weekday bitmask, Sunday = bit 0.
    pub week_days: u8,
    pub week_number: Option<WeekNumber>,
    /// 1..=31; clamped to the month length during enumeration.
    pub day_of_month: u8,
    /// 1..=12, yearly patterns only.
    pub month: u8,
    pub first_day_of_week: Weekday,
    pub end: RecurrenceEnd,
    /// Occurrence count (authoritative for `AfterCount`, derived or the
    /// display sentinel otherwise).
    pub count: u32,
    /// Local start of the last occurrence (derived or sentinel).
    pub end_date: NaiveDateTime,
    /// Local midnight of the first pattern day.
    pub start_date: NaiveDateTime,
    pub start_time_offset_minutes: u32,
    pub end_time_offset_minutes: u32,
    /// Local starts of removed occurrences.
    pub deleted_occurrences: Vec<NaiveDateTime>,
    pub modified_occurrences: Vec<ModifiedOccurrence>,
    /// Human-readable pattern summary persisted with the blob.
    pub summary: String,
}

impl RecurrenceDescriptor {
    /// A minimal daily pattern starting at `start_date` local midnight.
    #[must_use]
    pub fn new(frequency: PatternFrequency, start_date: NaiveDateTime) -> Self {
        Self {
            frequency,
            interval: 1,
            week_days: 0,
            week_number: None,
            day_of_month: 0,
            month: 0,
            first_day_of_week: match frequency {
                PatternFrequency::Weekly => Weekday::Monday,
                _ => Weekday::Sunday,
            },
            end: RecurrenceEnd::Never,
            count: NEVER_DISPLAY_COUNT,
            end_date: never_end_date(),
            start_date,
            start_time_offset_minutes: 0,
            end_time_offset_minutes: 0,
            deleted_occurrences: Vec::new(),
            modified_occurrences: Vec::new(),
            summary: String::new(),
        }
    }

    /// Registers a modified occurrence, keeping the table sorted by base
    /// date, and returns its stable slot index.
    pub fn add_modified_occurrence(&mut self, modified: ModifiedOccurrence) -> usize {
        if let Some(pos) = self
            .modified_occurrences
            .iter()
            .position(|m| m.base == modified.base)
        {
            self.modified_occurrences[pos] = modified;
            return pos;
        }
        let pos = self
            .modified_occurrences
            .partition_point(|m| m.base < modified.base);
        self.modified_occurrences.insert(pos, modified);
        pos
    }

    /// Whether an occurrence on the given local date was deleted.
    #[must_use]
    pub fn is_deleted_on(&self, date: chrono::NaiveDate) -> bool {
        self.deleted_occurrences.iter().any(|d| d.date() == date)
    }

    /// The modified occurrence anchored at the given local date, if any.
    #[must_use]
    pub fn modified_on(&self, date: chrono::NaiveDate) -> Option<&ModifiedOccurrence> {
        self.modified_occurrences
            .iter()
            .find(|m| m.base.date() == date)
    }

    /// Generates the human-readable pattern summary, e.g.
    /// "every 2 weeks on Monday, Friday".
    #[must_use]
    pub fn pattern_summary(&self) -> String {
        let unit = match self.frequency {
            PatternFrequency::Daily => "day",
            PatternFrequency::Weekly => "week",
            PatternFrequency::Monthly => "month",
            PatternFrequency::Yearly => "year",
        };

        let mut out = if self.interval == 1 {
            format!("every {unit}")
        } else {
            format!("every {} {unit}s", self.interval)
        };

        if self.week_days != 0 {
            let days: Vec<&str> = (0..7u8)
                .filter(|i| self.week_days & (1 << i) != 0)
                .map(weekday_name)
                .collect();
            out.push_str(" on ");
            out.push_str(&days.join(", "));
        } else if self.day_of_month != 0 {
            out.push_str(&format!(" on day {}", self.day_of_month));
        } else {
            // Plain daily/weekly pattern
        }

        match self.end {
            RecurrenceEnd::AfterCount(n) => out.push_str(&format!(", {n} times")),
            RecurrenceEnd::OnDate(d) => {
                out.push_str(&format!(", until {}", d.date()));
            }
            RecurrenceEnd::Never => {}
        }

        out
    }
}

const fn weekday_name(index: u8) -> &'static str {
    match index {
        0 => "Sunday",
        1 => "Monday",
        2 => "Tuesday",
        3 => "Wednesday",
        4 => "Thursday",
        5 => "Friday",
        _ => "Saturday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn week_number_ordinals() {
        assert_eq!(WeekNumber::Second.byday_ordinal(), 2);
        assert_eq!(WeekNumber::Last.byday_ordinal(), -1);
        assert_eq!(WeekNumber::from_ordinal(-1), Some(WeekNumber::Last));
        assert_eq!(WeekNumber::from_ordinal(0), None);
    }

    #[test]
    fn weekday_bits() {
        assert_eq!(weekday_bit(Weekday::Sunday), 0b0000_0001);
        assert_eq!(weekday_bit(Weekday::Friday), 0b0010_0000);
    }

    #[test]
    fn weekly_defaults_to_monday_week_start() {
        let desc = RecurrenceDescriptor::new(PatternFrequency::Weekly, start());
        assert_eq!(desc.first_day_of_week, Weekday::Monday);
        let desc = RecurrenceDescriptor::new(PatternFrequency::Daily, start());
        assert_eq!(desc.first_day_of_week, Weekday::Sunday);
    }

    #[test]
    fn never_end_defaults() {
        let desc = RecurrenceDescriptor::new(PatternFrequency::Daily, start());
        assert_eq!(desc.count, NEVER_DISPLAY_COUNT);
        assert_eq!(desc.end_date.date().to_string(), "4500-12-31");
    }

    #[test]
    fn modified_occurrences_keep_stable_sorted_slots() {
        let mut desc = RecurrenceDescriptor::new(PatternFrequency::Daily, start());
        let day = |d: u32| {
            NaiveDate::from_ymd_opt(2026, 3, d)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap()
        };

        let second = desc.add_modified_occurrence(ModifiedOccurrence {
            base: day(10),
            ..ModifiedOccurrence::default()
        });
        let first = desc.add_modified_occurrence(ModifiedOccurrence {
            base: day(5),
            ..ModifiedOccurrence::default()
        });
        assert_eq!(second, 0);
        assert_eq!(first, 0);
        assert_eq!(desc.modified_occurrences[1].base, day(10));

        // Re-adding the same base replaces in place
        let again = desc.add_modified_occurrence(ModifiedOccurrence {
            base: day(10),
            subject: Some("moved".into()),
            ..ModifiedOccurrence::default()
        });
        assert_eq!(again, 1);
        assert_eq!(desc.modified_occurrences.len(), 2);
    }

    #[test]
    fn summary_wording() {
        let mut desc = RecurrenceDescriptor::new(PatternFrequency::Weekly, start());
        desc.interval = 2;
        desc.week_days = weekday_bit(Weekday::Monday) | weekday_bit(Weekday::Friday);
        desc.end = RecurrenceEnd::AfterCount(5);
        assert_eq!(desc.pattern_summary(), "every 2 weeks on Monday, Friday, 5 times");
    }
}
