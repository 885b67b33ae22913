//! Timezone name resolution with per-session caching.
//!
//! Resolution order for a named timezone (spec order, each step logged):
//! 1. Built-in Olson database (`chrono-tz`), after ICU4X normalization of
//!    Windows display names, IANA aliases, and client-specific prefixes
//! 2. A raw binary Windows-style struct attached to the item, if any
//! 3. Fixed "Etc/UTC" with a recorded "(GMT±HHMM)" fallback name

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, Offset, TimeZone, Timelike};
use chrono_tz::Tz;
use dovetail_core::{ConvertError, ConvertResult};
use icu::time::zone::WindowsParser;
use icu::time::zone::iana::IanaParserExtended;

use super::{TimezoneRule, TransitionRule, decode_raw_struct};

/// A resolved timezone: the rule plus the name the item should carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTimezone {
    pub name: String,
    pub rule: TimezoneRule,
}

/// Resolver with a per-session `name → rule` cache.
///
/// The cache is the only mutable state carried across items in one
/// conversion session; it is never shared across sessions and callers
/// running conversions concurrently must synchronize or duplicate it.
#[derive(Debug, Default)]
pub struct TimezoneResolver {
    cache: HashMap<String, TimezoneRule>,
}

impl TimezoneResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a rule parsed from an in-payload VTIMEZONE so later
    /// lookups by that TZID hit the cache.
    pub fn register(&mut self, name: &str, rule: TimezoneRule) {
        self.cache.insert(name.to_string(), rule);
    }

    /// Resolves an explicitly named timezone against the built-in
    /// database.
    ///
    /// `year` anchors the derived transition rules (tzdata rules change
    /// over history; the item's own year gives the correct pair).
    ///
    /// ## Errors
    /// `NotFound` on a database miss; the caller may proceed with UTC.
    pub fn resolve(&mut self, name: &str, year: i32) -> ConvertResult<TimezoneRule> {
        if let Some(rule) = self.cache.get(name) {
            return Ok(*rule);
        }

        let normalized = normalize_tzid(name);
        let tz = Tz::from_str(&normalized)
            .map_err(|_| ConvertError::NotFound(format!("timezone {name}")))?;

        let rule = rule_from_tz(tz, year);
        self.cache.insert(name.to_string(), rule);
        Ok(rule)
    }

    /// Full resolution chain: database, then attached raw struct, then
    /// the UTC fallback with a "(GMT±HHMM)" display name.
    pub fn resolve_with_fallback(
        &mut self,
        name: Option<&str>,
        raw_struct: Option<&[u8]>,
        offset_hint_minutes: Option<i32>,
        year: i32,
    ) -> ResolvedTimezone {
        if let Some(name) = name {
            match self.resolve(name, year) {
                Ok(rule) => {
                    return ResolvedTimezone {
                        name: name.to_string(),
                        rule,
                    };
                }
                Err(e) => {
                    tracing::debug!(timezone = name, error = %e, "database miss");
                }
            }
        }

        if let Some(bytes) = raw_struct {
            match decode_raw_struct(bytes) {
                Ok(rule) => {
                    let name = name.map_or_else(
                        || fallback_name(rule.standard_offset_minutes()),
                        ToString::to_string,
                    );
                    tracing::debug!(timezone = %name, "synthesized rule from raw struct");
                    self.cache.insert(name.clone(), rule);
                    return ResolvedTimezone { name, rule };
                }
                Err(e) => {
                    tracing::warn!(error = %e, "attached timezone struct is corrupt");
                }
            }
        }

        let offset = offset_hint_minutes.unwrap_or(0);
        let name = fallback_name(offset);
        tracing::warn!(fallback = %name, "timezone unresolved, using UTC");
        ResolvedTimezone {
            name,
            rule: TimezoneRule::utc(),
        }
    }
}

/// Builds the parenthesized GMT-offset fallback display name, e.g.
/// "(GMT+0530)"; a zero offset keeps the sign of the hint.
#[must_use]
pub fn fallback_name(offset_minutes: i32) -> String {
    let sign = if offset_minutes.is_negative() { '-' } else { '+' };
    let abs = offset_minutes.abs();
    format!("(GMT{}{:02}{:02})", sign, abs / 60, abs % 60)
}

/// Normalizes client TZID spellings to IANA names.
///
/// Windows display names ("W. Europe Standard Time") go through the
/// ICU4X Windows mapping; everything else through IANA alias
/// canonicalization (Europe/Kiev -> Europe/Kyiv). Unrecognized names
/// pass through unchanged.
fn normalize_tzid(tzid: &str) -> String {
    let stripped = tzid
        .strip_prefix("/mozilla.org/")
        .or_else(|| tzid.strip_prefix("/softwarestudio.org/"))
        .unwrap_or(tzid);

    let windows_parser = WindowsParser::new();
    if let Some(tz) = windows_parser.parse(stripped, None) {
        let iana_parser = IanaParserExtended::new();
        for entry in iana_parser.iter() {
            if entry.time_zone == tz {
                return entry.canonical.to_string();
            }
        }
    }

    let iana_parser = IanaParserExtended::new();
    let parsed = iana_parser.parse(stripped);
    if parsed.time_zone != icu::time::TimeZone::UNKNOWN {
        return parsed.canonical.to_string();
    }

    stripped.to_string()
}

/// Derives a store-shape rule from an Olson timezone for one year.
///
/// Samples the UTC offset through the year to find the two transition
/// instants (if any), then expresses each as an nth-weekday-of-month
/// local rule the way the Windows shape requires.
fn rule_from_tz(tz: Tz, year: i32) -> TimezoneRule {
    let offset_at = |naive_utc: chrono::NaiveDateTime| -> i32 {
        tz.offset_from_utc_datetime(&naive_utc)
            .fix()
            .local_minus_utc()
            / 60
    };

    let jan = NaiveDate::from_ymd_opt(year, 1, 15)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .map_or(0, offset_at);
    let jul = NaiveDate::from_ymd_opt(year, 7, 15)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .map_or(0, offset_at);

    if jan == jul {
        return TimezoneRule::fixed(jan);
    }

    let standard_offset = jan.min(jul);
    let daylight_offset = jan.max(jul);

    let mut daylight_rule = None;
    let mut standard_rule = None;

    // Walk the year day by day; where the offset changes, narrow the
    // transition instant to the hour and express it as a local rule.
    let Some(start) = NaiveDate::from_ymd_opt(year, 1, 1) else {
        return TimezoneRule::fixed(standard_offset);
    };
    let mut prev_offset = offset_at(start.and_hms_opt(0, 0, 0).unwrap_or_default());
    let mut cursor = start;

    for _ in 0..=366 {
        let Some(next) = cursor.succ_opt() else { break };
        let midnight = next.and_hms_opt(0, 0, 0).unwrap_or_default();
        let next_offset = offset_at(midnight);

        if next_offset != prev_offset {
            // Narrow within the preceding 24 hours
            let mut instant = cursor.and_hms_opt(0, 0, 0).unwrap_or_default();
            for _ in 0..24 {
                let probe = instant + Duration::hours(1);
                if offset_at(probe) != prev_offset {
                    break;
                }
                instant = probe;
            }
            let change_utc = instant + Duration::hours(1);

            // The Windows rule states the transition in the wall time
            // that was valid just before the change.
            let local_before = change_utc + Duration::minutes(i64::from(prev_offset));
            let rule = transition_rule_from_local(local_before);

            if next_offset > prev_offset {
                daylight_rule = Some(rule);
            } else {
                standard_rule = Some(rule);
            }
            prev_offset = next_offset;
        }
        cursor = next;
    }

    TimezoneRule {
        bias: -standard_offset,
        standard_bias: 0,
        daylight_bias: -(daylight_offset - standard_offset),
        standard_rule,
        daylight_rule,
    }
}

/// Expresses one local transition instant as an nth-weekday yearly rule.
fn transition_rule_from_local(local: chrono::NaiveDateTime) -> TransitionRule {
    let day = local.day();
    let month = local.month();
    let weekday = local.weekday().num_days_from_sunday();

    // Position of this weekday within its month; the final occurrence is
    // stored as week 5 ("last") so the rule survives year boundaries.
    let ordinal = (day - 1) / 7 + 1;
    let days_this_month = super::days_in_month(local.year(), {
        #[expect(clippy::cast_possible_truncation, reason = "month is 1..=12")]
        let m = month as u8;
        m
    });
    let is_last = day + 7 > days_this_month;

    #[expect(clippy::cast_possible_truncation, reason = "calendar fields are small")]
    let rule = TransitionRule {
        year: 0,
        month: month as u8,
        weekday: weekday as u8,
        week: if is_last { 5 } else { ordinal as u8 },
        hour: local.hour() as u8,
        minute: local.minute() as u8,
    };
    rule
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn resolve_olson_name() {
        let mut resolver = TimezoneResolver::new();
        let rule = resolver.resolve("Europe/Berlin", 2026).unwrap();
        assert_eq!(rule.standard_offset_minutes(), 60);
        assert_eq!(rule.daylight_offset_minutes(), 120);
        assert!(rule.daylight_rule.is_some());
    }

    #[test]
    fn resolve_caches() {
        let mut resolver = TimezoneResolver::new();
        resolver.resolve("America/New_York", 2026).unwrap();
        assert!(resolver.cache.contains_key("America/New_York"));
    }

    #[test]
    fn resolve_miss_is_not_found() {
        let mut resolver = TimezoneResolver::new();
        let err = resolver.resolve("Nowhere/Atlantis", 2026).unwrap_err();
        assert!(matches!(err, ConvertError::NotFound(_)));
    }

    #[test]
    fn windows_display_name_resolves() {
        let mut resolver = TimezoneResolver::new();
        let rule = resolver.resolve("W. Europe Standard Time", 2026).unwrap();
        assert_eq!(rule.standard_offset_minutes(), 60);
    }

    #[test]
    fn mozilla_prefix_resolves() {
        let mut resolver = TimezoneResolver::new();
        let rule = resolver.resolve("/mozilla.org/America/New_York", 2026).unwrap();
        assert_eq!(rule.standard_offset_minutes(), -300);
    }

    #[test]
    fn berlin_rules_match_eu_dst() {
        let mut resolver = TimezoneResolver::new();
        let rule = resolver.resolve("Europe/Berlin", 2026).unwrap();

        let dst = rule.daylight_rule.unwrap();
        assert_eq!(dst.month, 3);
        assert_eq!(dst.weekday, 0);
        assert_eq!(dst.week, 5);
        assert_eq!(dst.hour, 2);

        let std = rule.standard_rule.unwrap();
        assert_eq!(std.month, 10);
        assert_eq!(std.week, 5);
        assert_eq!(std.hour, 3);
    }

    #[test]
    fn fixed_zone_has_no_rules() {
        let mut resolver = TimezoneResolver::new();
        let rule = resolver.resolve("Asia/Kolkata", 2026).unwrap();
        assert_eq!(rule.standard_offset_minutes(), 330);
        assert!(rule.daylight_rule.is_none());
        assert!(rule.standard_rule.is_none());
    }

    #[test]
    fn fallback_chain_uses_raw_struct() {
        let mut resolver = TimezoneResolver::new();
        let attached = TimezoneRule::fixed(90);
        let bytes = super::super::encode_raw_struct(&attached);

        let resolved =
            resolver.resolve_with_fallback(Some("Corp/Custom"), Some(&bytes), None, 2026);
        assert_eq!(resolved.rule.bias, -90);
        assert_eq!(resolved.name, "Corp/Custom");
    }

    #[test]
    fn fallback_chain_ends_at_utc() {
        let mut resolver = TimezoneResolver::new();
        let resolved = resolver.resolve_with_fallback(Some("Corp/Custom"), None, Some(-300), 2026);
        assert_eq!(resolved.rule, TimezoneRule::utc());
        assert_eq!(resolved.name, "(GMT-0500)");
    }

    #[test]
    fn fallback_name_zero_offset() {
        assert_eq!(fallback_name(0), "(GMT+0000)");
        assert_eq!(fallback_name(-1), "(GMT-0001)");
    }

    #[test]
    fn derived_conversion_agrees_with_chrono() {
        let mut resolver = TimezoneResolver::new();
        let rule = resolver.resolve("America/New_York", 2026).unwrap();

        // July is EDT (UTC-4)
        let local = NaiveDate::from_ymd_opt(2026, 7, 4)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let utc = rule.local_to_utc(local);
        assert_eq!(utc.naive_utc().hour(), 13);

        // January is EST (UTC-5)
        let local = NaiveDate::from_ymd_opt(2026, 1, 4)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let utc = rule.local_to_utc(local);
        assert_eq!(utc.naive_utc().hour(), 14);
    }
}
