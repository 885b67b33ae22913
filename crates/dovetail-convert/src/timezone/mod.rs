//! Timezone rules and conversion arithmetic.
//!
//! The store models a timezone the way Windows does: a base bias plus
//! standard/daylight deltas (all in minutes, `UTC = local + bias`) and
//! yearly transition rules expressed as "nth weekday of month at
//! HH:MM". This module holds that rule type, the pure local/UTC
//! arithmetic on it, and the binary struct codec for rules attached to
//! items; name resolution and VTIMEZONE interconversion live in the
//! sibling modules.

mod resolver;
mod vtimezone;

pub use resolver::{ResolvedTimezone, TimezoneResolver, fallback_name};
pub use vtimezone::{absolute_to_yearly, rule_to_vtimezone, vtimezone_to_rule};

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc};
use dovetail_core::{ConvertError, ConvertResult};

/// A yearly (or one-shot) offset transition.
///
/// With `year == 0` the transition recurs every year on the `week`-th
/// `weekday` of `month` (`week == 5` means last). With `year != 0` it is
/// a single absolute date and `week` holds the day of month instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransitionRule {
    pub year: u16,
    /// 1..=12; 0 means "no transition" and disables the rule.
    pub month: u8,
    /// Day of week, Sunday = 0 (yearly form only).
    pub weekday: u8,
    /// Week-in-month 1..=5 (5 = last), or day-of-month in absolute form.
    pub week: u8,
    pub hour: u8,
    pub minute: u8,
}

impl TransitionRule {
    /// Whether this rule describes an actual transition.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.month != 0
    }

    /// Whether this is a single historical transition rather than a
    /// yearly recurrence.
    #[must_use]
    pub const fn is_absolute(&self) -> bool {
        self.year != 0
    }

    /// The local wall-clock instant of this transition in `year`, if it
    /// occurs that year.
    #[must_use]
    pub fn occurrence_in(&self, year: i32) -> Option<NaiveDateTime> {
        if !self.is_active() {
            return None;
        }

        let date = if self.is_absolute() {
            if i32::from(self.year) != year {
                return None;
            }
            NaiveDate::from_ymd_opt(year, u32::from(self.month), u32::from(self.week))?
        } else {
            nth_weekday_of_month(year, self.month, self.weekday, self.week)?
        };

        date.and_hms_opt(u32::from(self.hour), u32::from(self.minute), 0)
    }
}

/// A complete timezone rule in the store's Windows-shaped form.
///
/// `bias` is minutes such that `UTC = local + bias + active_bias`, where
/// `active_bias` is `standard_bias` or `daylight_bias` depending on the
/// wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimezoneRule {
    pub bias: i32,
    pub standard_bias: i32,
    pub daylight_bias: i32,
    pub standard_rule: Option<TransitionRule>,
    pub daylight_rule: Option<TransitionRule>,
}

impl TimezoneRule {
    /// The UTC rule: zero bias, no transitions.
    #[must_use]
    pub const fn utc() -> Self {
        Self {
            bias: 0,
            standard_bias: 0,
            daylight_bias: 0,
            standard_rule: None,
            daylight_rule: None,
        }
    }

    /// A fixed-offset rule for `offset_minutes` east of UTC.
    #[must_use]
    pub const fn fixed(offset_minutes: i32) -> Self {
        Self {
            bias: -offset_minutes,
            standard_bias: 0,
            daylight_bias: 0,
            standard_rule: None,
            daylight_rule: None,
        }
    }

    /// Whether daylight saving is in effect at the given local time.
    #[must_use]
    pub fn in_daylight(&self, local: NaiveDateTime) -> bool {
        let (Some(std_rule), Some(dst_rule)) = (self.standard_rule, self.daylight_rule) else {
            return false;
        };
        if !std_rule.is_active() || !dst_rule.is_active() {
            return false;
        }

        let year = local.year();
        let (Some(std_at), Some(dst_at)) = (
            std_rule.occurrence_in(year),
            dst_rule.occurrence_in(year),
        ) else {
            return false;
        };

        if dst_at < std_at {
            // Northern hemisphere: daylight runs dst..std
            local >= dst_at && local < std_at
        } else {
            // Southern hemisphere: daylight wraps the new year
            local >= dst_at || local < std_at
        }
    }

    /// Total minutes to add to local time to reach UTC at this instant.
    #[must_use]
    pub fn total_bias_at(&self, local: NaiveDateTime) -> i32 {
        if self.in_daylight(local) {
            self.bias + self.daylight_bias
        } else {
            self.bias + self.standard_bias
        }
    }

    /// Offset east of UTC in minutes while standard time is in effect.
    #[must_use]
    pub const fn standard_offset_minutes(&self) -> i32 {
        -(self.bias + self.standard_bias)
    }

    /// Offset east of UTC in minutes while daylight time is in effect.
    #[must_use]
    pub const fn daylight_offset_minutes(&self) -> i32 {
        -(self.bias + self.daylight_bias)
    }

    /// Converts a local wall-clock time to UTC. Pure arithmetic.
    #[must_use]
    pub fn local_to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        let utc_naive = local + Duration::minutes(i64::from(self.total_bias_at(local)));
        DateTime::from_naive_utc_and_offset(utc_naive, Utc)
    }

    /// Converts a UTC instant to local wall-clock time. Pure arithmetic.
    ///
    /// The active bias depends on the local result, so convert with the
    /// standard bias first and correct if that lands in daylight time.
    #[must_use]
    pub fn utc_to_local(&self, utc: DateTime<Utc>) -> NaiveDateTime {
        let naive = utc.naive_utc();
        let guess = naive - Duration::minutes(i64::from(self.bias + self.standard_bias));
        if self.in_daylight(guess) {
            naive - Duration::minutes(i64::from(self.bias + self.daylight_bias))
        } else {
            guess
        }
    }
}

/// Returns the date of the `week`-th `weekday` (Sunday = 0) of a month;
/// `week == 5` selects the last occurrence.
#[must_use]
pub fn nth_weekday_of_month(year: i32, month: u8, weekday: u8, week: u8) -> Option<NaiveDate> {
    if month == 0 || month > 12 || week == 0 || week > 5 {
        return None;
    }

    let first = NaiveDate::from_ymd_opt(year, u32::from(month), 1)?;
    let first_weekday = first.weekday().num_days_from_sunday();
    let offset = (7 + u32::from(weekday) - first_weekday) % 7;
    let mut day = 1 + offset + 7 * (u32::from(week.min(5)) - 1);

    let days_in_month = days_in_month(year, month);
    while day > days_in_month {
        // Week 5 means "last": back off whole weeks until in range
        day -= 7;
    }

    NaiveDate::from_ymd_opt(year, u32::from(month), day)
}

/// Number of days in a month.
#[must_use]
pub fn days_in_month(year: i32, month: u8) -> u32 {
    let (next_y, next_m) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_y, u32::from(next_m), 1)
        .and_then(|d| d.pred_opt())
        .map_or(30, |d| d.day())
}

// Binary struct layout attached to items (44 bytes, little-endian):
// three i32 bias fields, then two transition rules of eight u16 fields
// each {year, month, weekday, week, hour, minute, 0, 0}.
const RAW_STRUCT_LEN: usize = 44;

/// Decodes the raw binary timezone struct carried on a store item.
///
/// ## Errors
/// Returns `CorruptData` if the buffer is not exactly the fixed layout.
pub fn decode_raw_struct(bytes: &[u8]) -> ConvertResult<TimezoneRule> {
    if bytes.len() != RAW_STRUCT_LEN {
        return Err(ConvertError::CorruptData(format!(
            "timezone struct must be {RAW_STRUCT_LEN} bytes, got {}",
            bytes.len()
        )));
    }

    let i32_at = |off: usize| {
        i32::from_le_bytes([bytes[off], bytes[off + 1], bytes[off + 2], bytes[off + 3]])
    };
    let u16_at = |off: usize| u16::from_le_bytes([bytes[off], bytes[off + 1]]);
    let rule_at = |off: usize| {
        #[expect(clippy::cast_possible_truncation, reason = "fields are single-byte on the wire side")]
        let rule = TransitionRule {
            year: u16_at(off),
            month: u16_at(off + 2) as u8,
            weekday: u16_at(off + 4) as u8,
            week: u16_at(off + 6) as u8,
            hour: u16_at(off + 8) as u8,
            minute: u16_at(off + 10) as u8,
        };
        rule.is_active().then_some(rule)
    };

    Ok(TimezoneRule {
        bias: i32_at(0),
        standard_bias: i32_at(4),
        daylight_bias: i32_at(8),
        standard_rule: rule_at(12),
        daylight_rule: rule_at(28),
    })
}

/// Encodes a rule into the raw binary struct form.
#[must_use]
pub fn encode_raw_struct(rule: &TimezoneRule) -> Vec<u8> {
    let mut out = Vec::with_capacity(RAW_STRUCT_LEN);
    out.extend_from_slice(&rule.bias.to_le_bytes());
    out.extend_from_slice(&rule.standard_bias.to_le_bytes());
    out.extend_from_slice(&rule.daylight_bias.to_le_bytes());
    for tr in [rule.standard_rule, rule.daylight_rule] {
        let tr = tr.unwrap_or_default();
        for field in [
            tr.year,
            u16::from(tr.month),
            u16::from(tr.weekday),
            u16::from(tr.week),
            u16::from(tr.hour),
            u16::from(tr.minute),
            0,
            0,
        ] {
            out.extend_from_slice(&field.to_le_bytes());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    /// Central European Time in store form: UTC+1, DST +2 from last
    /// Sunday of March 02:00 to last Sunday of October 03:00.
    fn berlin() -> TimezoneRule {
        TimezoneRule {
            bias: -60,
            standard_bias: 0,
            daylight_bias: -60,
            standard_rule: Some(TransitionRule {
                year: 0,
                month: 10,
                weekday: 0,
                week: 5,
                hour: 3,
                minute: 0,
            }),
            daylight_rule: Some(TransitionRule {
                year: 0,
                month: 3,
                weekday: 0,
                week: 5,
                hour: 2,
                minute: 0,
            }),
        }
    }

    #[test]
    fn nth_weekday_basic() {
        // First Monday of March 2026 is the 2nd
        assert_eq!(
            nth_weekday_of_month(2026, 3, 1, 1),
            NaiveDate::from_ymd_opt(2026, 3, 2)
        );
        // Last Sunday of March 2026 is the 29th
        assert_eq!(
            nth_weekday_of_month(2026, 3, 0, 5),
            NaiveDate::from_ymd_opt(2026, 3, 29)
        );
    }

    #[test]
    fn winter_conversion() {
        let rule = berlin();
        let local = NaiveDate::from_ymd_opt(2026, 1, 15)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let utc = rule.local_to_utc(local);
        assert_eq!(utc, Utc.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap());
        assert_eq!(rule.utc_to_local(utc), local);
    }

    #[test]
    fn summer_conversion() {
        let rule = berlin();
        let local = NaiveDate::from_ymd_opt(2026, 7, 15)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let utc = rule.local_to_utc(local);
        assert_eq!(utc, Utc.with_ymd_and_hms(2026, 7, 15, 8, 0, 0).unwrap());
        assert_eq!(rule.utc_to_local(utc), local);
    }

    #[test]
    fn daylight_boundaries() {
        let rule = berlin();
        let before = NaiveDate::from_ymd_opt(2026, 3, 29)
            .unwrap()
            .and_hms_opt(1, 59, 0)
            .unwrap();
        let after = NaiveDate::from_ymd_opt(2026, 3, 29)
            .unwrap()
            .and_hms_opt(3, 0, 0)
            .unwrap();
        assert!(!rule.in_daylight(before));
        assert!(rule.in_daylight(after));
    }

    #[test]
    fn fixed_rule_has_no_daylight() {
        let rule = TimezoneRule::fixed(330); // UTC+5:30
        let local = NaiveDate::from_ymd_opt(2026, 7, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert!(!rule.in_daylight(local));
        let utc = rule.local_to_utc(local);
        assert_eq!(utc, Utc.with_ymd_and_hms(2026, 7, 1, 6, 30, 0).unwrap());
    }

    #[test]
    fn raw_struct_round_trip() {
        let rule = berlin();
        let bytes = encode_raw_struct(&rule);
        assert_eq!(bytes.len(), 44);
        let back = decode_raw_struct(&bytes).unwrap();
        assert_eq!(back, rule);
        // Bias fields reproduced exactly
        assert_eq!(back.bias, -60);
        assert_eq!(back.daylight_bias, -60);
    }

    #[test]
    fn raw_struct_rejects_truncated() {
        let err = decode_raw_struct(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, ConvertError::CorruptData(_)));
    }

    #[test]
    fn absolute_transition_only_fires_its_year() {
        let rule = TransitionRule {
            year: 1987,
            month: 4,
            weekday: 0,
            week: 12, // day of month in absolute form
            hour: 2,
            minute: 0,
        };
        assert!(rule.occurrence_in(1987).is_some());
        assert!(rule.occurrence_in(1988).is_none());
    }
}
