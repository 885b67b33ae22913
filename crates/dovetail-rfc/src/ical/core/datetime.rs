//! Date and time value types (RFC 5545 §3.3.4, §3.3.5, §3.3.12, §3.3.14).

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// A calendar date (RFC 5545 DATE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Date {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl Date {
    #[must_use]
    pub const fn new(year: u16, month: u8, day: u8) -> Self {
        Self { year, month, day }
    }

    /// Converts to a `chrono::NaiveDate`; `None` for out-of-range dates.
    #[must_use]
    pub fn to_naive(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(i32::from(self.year), u32::from(self.month), u32::from(self.day))
    }

    /// Builds a date from a `chrono::NaiveDate`.
    ///
    /// Years outside `0..=9999` are clamped; iCalendar cannot express them.
    #[must_use]
    #[expect(clippy::cast_possible_truncation, reason = "month/day are 1..=31")]
    pub fn from_naive(date: NaiveDate) -> Self {
        use chrono::Datelike;
        let year = u16::try_from(date.year().clamp(0, 9999)).unwrap_or(9999);
        Self {
            year,
            month: date.month() as u8,
            day: date.day() as u8,
        }
    }
}

impl std::fmt::Display for Date {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}{:02}{:02}", self.year, self.month, self.day)
    }
}

/// A time of day (RFC 5545 TIME).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Time {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub is_utc: bool,
}

impl std::fmt::Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}{:02}{:02}", self.hour, self.minute, self.second)?;
        if self.is_utc {
            write!(f, "Z")?;
        }
        Ok(())
    }
}

/// How a DATE-TIME value is anchored (RFC 5545 §3.3.5, forms 1-3).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DateTimeForm {
    /// Form 2: UTC time, trailing `Z`.
    Utc,
    /// Form 1: floating local time, no anchor.
    Floating,
    /// Form 3: local time with a TZID parameter.
    Zoned { tzid: String },
}

/// A date with time (RFC 5545 DATE-TIME).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub form: DateTimeForm,
}

impl DateTime {
    #[must_use]
    pub const fn utc(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            form: DateTimeForm::Utc,
        }
    }

    #[must_use]
    pub const fn floating(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            form: DateTimeForm::Floating,
        }
    }

    #[must_use]
    pub fn zoned(tzid: impl Into<String>, naive: NaiveDateTime) -> Self {
        let mut dt = Self::from_naive(naive, DateTimeForm::Floating);
        dt.form = DateTimeForm::Zoned { tzid: tzid.into() };
        dt
    }

    #[must_use]
    pub const fn is_utc(&self) -> bool {
        matches!(self.form, DateTimeForm::Utc)
    }

    #[must_use]
    pub const fn is_floating(&self) -> bool {
        matches!(self.form, DateTimeForm::Floating)
    }

    /// The TZID this value is anchored to, if zoned.
    #[must_use]
    pub fn tzid(&self) -> Option<&str> {
        match &self.form {
            DateTimeForm::Zoned { tzid } => Some(tzid),
            DateTimeForm::Utc | DateTimeForm::Floating => None,
        }
    }

    /// The date portion.
    #[must_use]
    pub const fn date(&self) -> Date {
        Date {
            year: self.year,
            month: self.month,
            day: self.day,
        }
    }

    /// Converts the wall-clock fields to a `chrono::NaiveDateTime`,
    /// ignoring the form anchor.
    #[must_use]
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        let date = NaiveDate::from_ymd_opt(
            i32::from(self.year),
            u32::from(self.month),
            u32::from(self.day),
        )?;
        let time = NaiveTime::from_hms_opt(
            u32::from(self.hour),
            u32::from(self.minute),
            u32::from(self.second),
        )?;
        Some(NaiveDateTime::new(date, time))
    }

    /// Builds wall-clock fields from a `chrono::NaiveDateTime`.
    #[must_use]
    #[expect(clippy::cast_possible_truncation, reason = "calendar fields are small")]
    pub fn from_naive(naive: NaiveDateTime, form: DateTimeForm) -> Self {
        use chrono::{Datelike, Timelike};
        let year = u16::try_from(naive.year().clamp(0, 9999)).unwrap_or(9999);
        Self {
            year,
            month: naive.month() as u8,
            day: naive.day() as u8,
            hour: naive.hour() as u8,
            minute: naive.minute() as u8,
            second: naive.second() as u8,
            form,
        }
    }

    /// Builds a UTC DATE-TIME from a `chrono::DateTime<Utc>`.
    #[must_use]
    pub fn from_utc(dt: chrono::DateTime<chrono::Utc>) -> Self {
        Self::from_naive(dt.naive_utc(), DateTimeForm::Utc)
    }
}

impl std::fmt::Display for DateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}{:02}{:02}T{:02}{:02}{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )?;
        if self.is_utc() {
            write!(f, "Z")?;
        }
        Ok(())
    }
}

/// A UTC offset (RFC 5545 UTC-OFFSET), stored in seconds east of UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtcOffset {
    seconds: i32,
}

impl UtcOffset {
    #[must_use]
    pub const fn from_seconds(seconds: i32) -> Self {
        Self { seconds }
    }

    #[must_use]
    pub const fn from_minutes(minutes: i32) -> Self {
        Self {
            seconds: minutes * 60,
        }
    }

    #[must_use]
    pub const fn total_seconds(self) -> i32 {
        self.seconds
    }

    #[must_use]
    pub const fn total_minutes(self) -> i32 {
        self.seconds / 60
    }

    /// Whole hours component, signed.
    #[must_use]
    pub const fn hours(self) -> i32 {
        self.seconds / 3600
    }

    /// Minutes component, unsigned remainder.
    #[must_use]
    pub const fn minutes(self) -> i32 {
        (self.seconds.abs() % 3600) / 60
    }
}

impl std::fmt::Display for UtcOffset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.seconds < 0 { '-' } else { '+' };
        let abs = self.seconds.abs();
        write!(f, "{}{:02}{:02}", sign, abs / 3600, (abs % 3600) / 60)?;
        if abs % 60 != 0 {
            write!(f, "{:02}", abs % 60)?;
        }
        Ok(())
    }
}
