//! VTIMEZONE component interconversion (RFC 5545 §3.6.5).

use chrono::Datelike;
use dovetail_core::{ConvertError, ConvertResult};
use dovetail_rfc::ical::core::{
    Component, ComponentKind, DateTime, Frequency, Property, RRule, UtcOffset, Weekday,
    WeekdayNum,
};

use super::{TimezoneRule, TransitionRule, days_in_month, nth_weekday_of_month};

/// Emits a VTIMEZONE component for a rule.
///
/// Zones with both transitions get STANDARD and DAYLIGHT sub-blocks with
/// YEARLY rules. Fixed-offset zones (no transition month) get a single
/// STANDARD block with no recurrence rule. A single absolute transition
/// is emitted as a DTSTART-only block on that date.
#[must_use]
pub fn rule_to_vtimezone(name: &str, rule: &TimezoneRule) -> Component {
    let mut vtz = Component::timezone();
    vtz.add_property(Property::text("TZID", name));

    let std_offset = UtcOffset::from_minutes(rule.standard_offset_minutes());
    let dst_offset = UtcOffset::from_minutes(rule.daylight_offset_minutes());

    let recurring_pair = matches!(
        (rule.standard_rule, rule.daylight_rule),
        (Some(s), Some(d)) if s.is_active() && d.is_active()
    );

    if recurring_pair {
        if let Some(std_rule) = rule.standard_rule {
            vtz.add_child(transition_block(
                ComponentKind::Standard,
                &std_rule,
                dst_offset,
                std_offset,
            ));
        }
        if let Some(dst_rule) = rule.daylight_rule {
            vtz.add_child(transition_block(
                ComponentKind::Daylight,
                &dst_rule,
                std_offset,
                dst_offset,
            ));
        }
    } else {
        // Fixed offset: one base block, no recurrence
        let mut block = Component::new(ComponentKind::Standard);
        block.add_property(Property::datetime(
            "DTSTART",
            DateTime::floating(1970, 1, 1, 0, 0, 0),
        ));
        block.add_property(offset_property("TZOFFSETFROM", std_offset));
        block.add_property(offset_property("TZOFFSETTO", std_offset));
        vtz.add_child(block);
    }

    vtz
}

/// Builds one STANDARD/DAYLIGHT sub-block.
fn transition_block(
    kind: ComponentKind,
    rule: &TransitionRule,
    offset_from: UtcOffset,
    offset_to: UtcOffset,
) -> Component {
    let mut block = Component::new(kind);

    if rule.is_absolute() {
        // One historical transition: DTSTART alone carries the date; the
        // weekday/position shape is re-derived from it on parse.
        block.add_property(Property::datetime(
            "DTSTART",
            DateTime::floating(rule.year, rule.month, rule.week, rule.hour, rule.minute, 0),
        ));
    } else {
        let first_year = 1970;
        let day = nth_weekday_of_month(first_year, rule.month, rule.weekday, rule.week)
            .map_or(1, |d| {
                #[expect(clippy::cast_possible_truncation, reason = "day of month fits u8")]
                let day = d.day() as u8;
                day
            });
        #[expect(clippy::cast_possible_truncation, reason = "fixed epoch year")]
        block.add_property(Property::datetime(
            "DTSTART",
            DateTime::floating(first_year as u16, rule.month, day, rule.hour, rule.minute, 0),
        ));

        let mut rrule = RRule::new();
        rrule.freq = Some(Frequency::Yearly);
        rrule.by_month = vec![rule.month];
        rrule.by_day = vec![WeekdayNum {
            ordinal: Some(if rule.week >= 5 {
                -1
            } else {
                i8::try_from(rule.week).unwrap_or(1)
            }),
            weekday: Weekday::from_number(rule.weekday),
        }];
        block.add_property(Property::recur("RRULE", rrule));
    }

    block.add_property(offset_property("TZOFFSETFROM", offset_from));
    block.add_property(offset_property("TZOFFSETTO", offset_to));
    block
}

fn offset_property(name: &str, offset: UtcOffset) -> Property {
    let mut prop = Property::text(name, offset.to_string());
    prop.value = dovetail_rfc::ical::core::Value::UtcOffset(offset);
    prop
}

/// Parses a VTIMEZONE component into a store rule.
///
/// ## Errors
/// `NotFound` if TZID is missing, `InvalidObject` if no usable
/// STANDARD/DAYLIGHT block is present.
pub fn vtimezone_to_rule(component: &Component) -> ConvertResult<(String, TimezoneRule)> {
    if component.kind != Some(ComponentKind::Timezone) {
        return Err(ConvertError::InvalidObject(format!(
            "expected VTIMEZONE, got {}",
            component.name
        )));
    }

    let tzid = component
        .get_property("TZID")
        .and_then(Property::as_text)
        .ok_or_else(|| ConvertError::NotFound("VTIMEZONE without TZID".to_string()))?
        .to_string();

    let mut standard: Option<(UtcOffset, Option<TransitionRule>)> = None;
    let mut daylight: Option<(UtcOffset, Option<TransitionRule>)> = None;

    for child in &component.children {
        match child.kind {
            Some(ComponentKind::Standard) => standard = Some(parse_block(child)?),
            Some(ComponentKind::Daylight) => daylight = Some(parse_block(child)?),
            _ => {}
        }
    }

    let Some((std_offset, std_rule)) = standard.or(daylight) else {
        return Err(ConvertError::InvalidObject(format!(
            "VTIMEZONE {tzid} has no STANDARD or DAYLIGHT block"
        )));
    };

    let rule = match daylight {
        Some((dst_offset, dst_rule)) if dst_offset != std_offset => TimezoneRule {
            bias: -std_offset.total_minutes(),
            standard_bias: 0,
            daylight_bias: -(dst_offset.total_minutes() - std_offset.total_minutes()),
            standard_rule: std_rule,
            daylight_rule: dst_rule,
        },
        _ => TimezoneRule::fixed(std_offset.total_minutes()),
    };

    Ok((tzid, rule))
}

/// Parses one STANDARD/DAYLIGHT block into its target offset and
/// transition rule.
fn parse_block(block: &Component) -> ConvertResult<(UtcOffset, Option<TransitionRule>)> {
    let offset_to = block
        .get_property("TZOFFSETTO")
        .and_then(|p| p.value.as_utc_offset())
        .ok_or_else(|| ConvertError::NotFound("transition block without TZOFFSETTO".to_string()))?;

    let rrule = block
        .get_property("RRULE")
        .and_then(|p| p.value.as_recur());
    let dtstart = block.get_property("DTSTART").and_then(Property::as_datetime);

    let rule = if let Some(rrule) = rrule {
        let month = rrule
            .by_month
            .first()
            .copied()
            .or(dtstart.map(|dt| dt.month))
            .unwrap_or(0);
        let byday = rrule.by_day.first();
        byday.map(|wd| TransitionRule {
            year: 0,
            month,
            weekday: wd.weekday.number(),
            week: match wd.ordinal {
                Some(ord) if ord < 0 => 5,
                Some(ord) => {
                    #[expect(clippy::cast_sign_loss, reason = "negative handled above")]
                    let week = (ord as u8).clamp(1, 5);
                    week
                }
                None => 1,
            },
            hour: dtstart.map_or(2, |dt| dt.hour),
            minute: dtstart.map_or(0, |dt| dt.minute),
        })
    } else {
        // No recurrence rule: derive shape from the single DTSTART
        dtstart.map(|dt| {
            let weekday = dt
                .to_naive()
                .map_or(0, |n| n.weekday().num_days_from_sunday());
            #[expect(clippy::cast_possible_truncation, reason = "weekday is 0..=6")]
            TransitionRule {
                year: dt.year,
                month: dt.month,
                weekday: weekday as u8,
                week: dt.day,
                hour: dt.hour,
                minute: dt.minute,
            }
        })
    };

    Ok((offset_to, rule))
}

/// Re-derives the weekday/position shape of an absolute transition, used
/// when a non-recurring rule must be displayed in yearly form.
#[must_use]
pub fn absolute_to_yearly(rule: &TransitionRule) -> TransitionRule {
    if !rule.is_absolute() {
        return *rule;
    }
    let ordinal = (u32::from(rule.week) - 1) / 7 + 1;
    let is_last =
        u32::from(rule.week) + 7 > days_in_month(i32::from(rule.year), rule.month);
    #[expect(clippy::cast_possible_truncation, reason = "ordinal is 1..=5")]
    let week = if is_last { 5 } else { ordinal as u8 };
    TransitionRule {
        year: 0,
        week,
        ..*rule
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn emit_dst_zone() {
        let vtz = rule_to_vtimezone("Europe/Berlin", &berlin());
        assert_eq!(vtz.children.len(), 2);

        let std = vtz.children_of_kind(ComponentKind::Standard)[0];
        let rrule = std.get_property("RRULE").unwrap().value.as_recur().unwrap();
        assert_eq!(rrule.by_month, vec![10]);
        assert_eq!(rrule.by_day[0].ordinal, Some(-1));
        assert_eq!(rrule.by_day[0].weekday, Weekday::Sunday);

        let dst = vtz.children_of_kind(ComponentKind::Daylight)[0];
        assert_eq!(
            dst.get_property("TZOFFSETTO").unwrap().raw_value,
            "+0200"
        );
    }

    #[test]
    fn emit_fixed_zone_has_no_rrule() {
        let vtz = rule_to_vtimezone("Asia/Kolkata", &TimezoneRule::fixed(330));
        assert_eq!(vtz.children.len(), 1);
        let block = &vtz.children[0];
        assert!(block.get_property("RRULE").is_none());
        assert_eq!(block.get_property("TZOFFSETTO").unwrap().raw_value, "+0530");
        assert_eq!(
            block.get_property("TZOFFSETFROM").unwrap().raw_value,
            "+0530"
        );
    }

    #[test]
    fn round_trip_dst_zone() {
        let original = berlin();
        let vtz = rule_to_vtimezone("Europe/Berlin", &original);
        let (tzid, parsed) = vtimezone_to_rule(&vtz).unwrap();
        assert_eq!(tzid, "Europe/Berlin");
        assert_eq!(parsed, original);
    }

    #[test]
    fn round_trip_fixed_zone() {
        let original = TimezoneRule::fixed(-300);
        let vtz = rule_to_vtimezone("EST-Fixed", &original);
        let (_, parsed) = vtimezone_to_rule(&vtz).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn parse_block_without_rrule_derives_from_dtstart() {
        // 1987-04-12 was a Sunday
        let mut vtz = Component::timezone();
        vtz.add_property(Property::text("TZID", "Legacy/Zone"));
        let mut std_block = Component::new(ComponentKind::Standard);
        std_block.add_property(Property::datetime(
            "DTSTART",
            DateTime::floating(1987, 4, 12, 2, 0, 0),
        ));
        std_block.add_property(offset_property("TZOFFSETFROM", UtcOffset::from_minutes(60)));
        std_block.add_property(offset_property("TZOFFSETTO", UtcOffset::from_minutes(60)));
        vtz.add_child(std_block);

        let (_, rule) = vtimezone_to_rule(&vtz).unwrap();
        // Fixed zone (from == to), offset preserved
        assert_eq!(rule.standard_offset_minutes(), 60);
    }

    #[test]
    fn absolute_rule_yearly_projection() {
        let rule = TransitionRule {
            year: 1987,
            month: 4,
            weekday: 0,
            week: 12,
            hour: 2,
            minute: 0,
        };
        let yearly = absolute_to_yearly(&rule);
        assert_eq!(yearly.year, 0);
        assert_eq!(yearly.week, 2); // 12th is in the second week
    }

    #[test]
    fn missing_tzid_is_not_found() {
        let vtz = Component::timezone();
        assert!(matches!(
            vtimezone_to_rule(&vtz),
            Err(ConvertError::NotFound(_))
        ));
    }
}
