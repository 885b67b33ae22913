//! VALARM ⇄ reminder property conversion.
//!
//! The store keeps reminders as three properties (set flag, minutes
//! before start, absolute signal time) plus two client snooze/acknowledge
//! extensions that round-trip as opaque timestamps.

use chrono::{DateTime, Duration, Utc};
use dovetail_rfc::ical::core::{Component, DateTime as IcalDateTime, Duration as IcalDuration, Parameter, Property, Value};

use crate::item::ItemKind;

/// Magic value some store clients persist to mean "use the default
/// reminder lead time"; normalized on input.
pub const DEFAULT_REMINDER_SENTINEL: u32 = 1_525_252_321;

/// Reminder state extracted from or destined for a VALARM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reminder {
    pub is_set: bool,
    /// Lead time before the item start. Never negative: iCalendar allows
    /// post-start triggers, the store model does not.
    pub minutes_before: u32,
    /// Absolute signal time (explicit for tasks, derived otherwise).
    pub reminder_time: Option<DateTime<Utc>>,
    /// Client snooze extension (X-MOZ-SNOOZE-TIME*).
    pub snooze_time: Option<DateTime<Utc>>,
    /// Client acknowledge extension (X-MOZ-LASTACK).
    pub acknowledged: Option<DateTime<Utc>>,
}

/// Extracts reminder state from a VALARM component.
///
/// `item_start` anchors relative triggers; `default_minutes` replaces
/// the sentinel.
#[must_use]
pub fn alarm_to_reminder(
    alarm: &Component,
    item_start: Option<DateTime<Utc>>,
    default_minutes: u32,
) -> Reminder {
    let mut reminder = Reminder {
        is_set: true,
        minutes_before: default_minutes,
        ..Reminder::default()
    };

    if let Some(trigger) = alarm.get_property("TRIGGER") {
        match &trigger.value {
            Value::Duration(d) => {
                let minutes = d.total_minutes();
                // A non-negative trigger fires at or after the start;
                // clamp to zero lead time.
                reminder.minutes_before = u32::try_from(-minutes).unwrap_or(0);
                reminder.reminder_time = item_start
                    .map(|start| start + Duration::minutes(minutes));
            }
            Value::DateTime(dt) => {
                let signal = dt
                    .to_naive()
                    .map(|n| DateTime::from_naive_utc_and_offset(n, Utc));
                reminder.reminder_time = signal;
                if let (Some(signal), Some(start)) = (signal, item_start) {
                    let minutes = (start - signal).num_minutes();
                    reminder.minutes_before = u32::try_from(minutes).unwrap_or(0);
                }
            }
            _ => {}
        }
    }

    if reminder.minutes_before == DEFAULT_REMINDER_SENTINEL {
        tracing::debug!("reminder sentinel normalized to default");
        reminder.minutes_before = default_minutes;
    }

    // Snooze/acknowledge extensions live on the parent component in the
    // wild, but some clients nest them in the alarm; accept both here.
    for prop in &alarm.properties {
        apply_extension(&mut reminder, prop);
    }

    reminder
}

/// Folds one snooze/acknowledge extension property into the reminder.
///
/// The snooze property name may carry a suffix derived from the original
/// trigger time (`X-MOZ-SNOOZE-TIME-1234567890000000`); any suffix is
/// accepted.
pub fn apply_extension(reminder: &mut Reminder, prop: &Property) {
    if prop.name == "X-MOZ-LASTACK" {
        reminder.acknowledged = parse_utc_stamp(&prop.raw_value);
    } else if prop.name.starts_with("X-MOZ-SNOOZE-TIME") {
        reminder.snooze_time = parse_utc_stamp(&prop.raw_value);
    } else {
        // Not an extension this converter knows
    }
}

/// Builds a VALARM for the reminder.
///
/// Events get a negative-duration trigger; tasks with an explicit signal
/// time get an absolute trigger instead.
#[must_use]
pub fn reminder_to_alarm(reminder: &Reminder, kind: ItemKind) -> Component {
    let mut alarm = Component::alarm();
    alarm.add_property(Property::text("ACTION", "DISPLAY"));
    alarm.add_property(Property::text("DESCRIPTION", "Reminder"));

    if kind == ItemKind::Task
        && let Some(signal) = reminder.reminder_time
    {
        let mut prop = Property::datetime("TRIGGER", IcalDateTime::from_utc(signal));
        prop.set_param(Parameter::value_type("DATE-TIME"));
        alarm.add_property(prop);
        return alarm;
    }

    let trigger = IcalDuration {
        negative: reminder.minutes_before > 0,
        minutes: reminder.minutes_before % 60,
        hours: reminder.minutes_before / 60,
        ..IcalDuration::zero()
    };
    alarm.add_property(Property::duration("TRIGGER", trigger));
    alarm
}

/// Emits the snooze/acknowledge extension properties for the parent
/// component, keyed by the original trigger time.
#[must_use]
pub fn extension_properties(
    reminder: &Reminder,
    recurring: bool,
) -> Vec<Property> {
    let mut props = Vec::new();

    if let Some(ack) = reminder.acknowledged {
        props.push(Property::text("X-MOZ-LASTACK", format_utc_stamp(ack)));
    }

    if let Some(snooze) = reminder.snooze_time {
        let name = if recurring {
            // Recurring series key the snooze by the trigger it snoozed
            reminder.reminder_time.map_or_else(
                || "X-MOZ-SNOOZE-TIME".to_string(),
                |t| format!("X-MOZ-SNOOZE-TIME-{}", t.timestamp_micros()),
            )
        } else {
            "X-MOZ-SNOOZE-TIME".to_string()
        };
        props.push(Property::text(name, format_utc_stamp(snooze)));
    }

    props
}

fn parse_utc_stamp(raw: &str) -> Option<DateTime<Utc>> {
    let dt = dovetail_rfc::ical::parse::parse_datetime(raw, None, 0, 0).ok()?;
    let naive = dt.to_naive()?;
    Some(DateTime::from_naive_utc_and_offset(naive, Utc))
}

fn format_utc_stamp(dt: DateTime<Utc>) -> String {
    IcalDateTime::from_utc(dt).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use dovetail_rfc::ical::core::ComponentKind;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn alarm_with_trigger(value: &str) -> Component {
        let mut alarm = Component::alarm();
        alarm.add_property(Property::text("ACTION", "DISPLAY"));
        let duration = dovetail_rfc::ical::parse::parse_duration(value, 0, 0).unwrap();
        alarm.add_property(Property::duration("TRIGGER", duration));
        alarm
    }

    #[test]
    fn negative_trigger_gives_lead_minutes() {
        let alarm = alarm_with_trigger("-PT15M");
        let reminder = alarm_to_reminder(&alarm, Some(start()), 15);
        assert!(reminder.is_set);
        assert_eq!(reminder.minutes_before, 15);
        assert_eq!(
            reminder.reminder_time.unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 2, 8, 45, 0).unwrap()
        );
    }

    #[test]
    fn post_start_trigger_clamps_to_zero() {
        let alarm = alarm_with_trigger("PT10M");
        let reminder = alarm_to_reminder(&alarm, Some(start()), 15);
        assert_eq!(reminder.minutes_before, 0);
    }

    #[test]
    fn sentinel_normalizes_to_default() {
        let alarm = alarm_with_trigger(&format!("-PT{DEFAULT_REMINDER_SENTINEL}M"));
        let reminder = alarm_to_reminder(&alarm, None, 15);
        assert_eq!(reminder.minutes_before, 15);
    }

    #[test]
    fn absolute_trigger_computes_lead() {
        let mut alarm = Component::alarm();
        let mut prop = Property::datetime(
            "TRIGGER",
            IcalDateTime::utc(2026, 3, 2, 8, 30, 0),
        );
        prop.set_param(Parameter::value_type("DATE-TIME"));
        alarm.add_property(prop);

        let reminder = alarm_to_reminder(&alarm, Some(start()), 15);
        assert_eq!(reminder.minutes_before, 30);
        assert_eq!(
            reminder.reminder_time.unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 2, 8, 30, 0).unwrap()
        );
    }

    #[test]
    fn event_alarm_uses_duration_trigger() {
        let reminder = Reminder {
            is_set: true,
            minutes_before: 90,
            ..Reminder::default()
        };
        let alarm = reminder_to_alarm(&reminder, ItemKind::Event);
        assert_eq!(alarm.kind, Some(ComponentKind::Alarm));
        let trigger = alarm.get_property("TRIGGER").unwrap();
        assert_eq!(trigger.raw_value, "-PT1H30M");
    }

    #[test]
    fn task_alarm_uses_absolute_trigger() {
        let reminder = Reminder {
            is_set: true,
            minutes_before: 0,
            reminder_time: Some(Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()),
            ..Reminder::default()
        };
        let alarm = reminder_to_alarm(&reminder, ItemKind::Task);
        let trigger = alarm.get_property("TRIGGER").unwrap();
        assert_eq!(trigger.raw_value, "20260302T080000Z");
        assert_eq!(trigger.get_param_value("VALUE"), Some("DATE-TIME"));
    }

    #[test]
    fn snooze_and_ack_round_trip() {
        let mut reminder = Reminder {
            is_set: true,
            minutes_before: 15,
            reminder_time: Some(start()),
            ..Reminder::default()
        };
        let snooze = Property::text("X-MOZ-SNOOZE-TIME-1772517600000000", "20260302T091500Z");
        let ack = Property::text("X-MOZ-LASTACK", "20260302T090500Z");
        apply_extension(&mut reminder, &snooze);
        apply_extension(&mut reminder, &ack);

        assert_eq!(
            reminder.snooze_time.unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 2, 9, 15, 0).unwrap()
        );

        let props = extension_properties(&reminder, true);
        assert_eq!(props.len(), 2);
        assert_eq!(props[0].name, "X-MOZ-LASTACK");
        assert!(props[1].name.starts_with("X-MOZ-SNOOZE-TIME-"));
        assert_eq!(props[1].raw_value, "20260302T091500Z");
    }

    #[test]
    fn non_recurring_snooze_has_no_suffix() {
        let reminder = Reminder {
            is_set: true,
            minutes_before: 15,
            snooze_time: Some(start()),
            ..Reminder::default()
        };
        let props = extension_properties(&reminder, false);
        assert_eq!(props[0].name, "X-MOZ-SNOOZE-TIME");
    }
}
