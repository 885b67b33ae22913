//! VEVENT-specific conversion hooks.

use chrono::{Duration, NaiveDateTime, Timelike};
use dovetail_core::{ConvertError, ConvertResult, PropValue, tags};
use dovetail_rfc::ical::core::{Component, Date, DateTime as IcalDateTime, Property, Value};

use super::{ConvertContext, ItemSpecifics, maps};
use crate::item::{CalendarItem, ItemKind};
use crate::recurrence::local_datetime;
use crate::timezone::TimezoneRule;

pub(crate) struct EventSpecifics;

impl ItemSpecifics for EventSpecifics {
    fn kind(&self) -> ItemKind {
        ItemKind::Event
    }

    fn add_base_properties(
        &self,
        component: &Component,
        item: &mut CalendarItem,
        _ctx: &ConvertContext<'_>,
    ) -> ConvertResult<()> {
        if let Some(summary) = component.summary() {
            item.properties
                .set(tags::SUBJECT, PropValue::String(summary.to_string()));
        }
        if let Some(body) = component.description() {
            item.properties
                .set(tags::BODY, PropValue::String(body.to_string()));
        }
        if let Some(location) = component.location() {
            item.properties
                .set(tags::APPT_LOCATION, PropValue::String(location.to_string()));
        }

        if let Some(class) = component.get_property("CLASS").and_then(Property::as_text) {
            item.properties.set(
                tags::SENSITIVITY,
                PropValue::Int32(maps::class_to_sensitivity(class)),
            );
        }
        if let Some(priority) = component
            .get_property("PRIORITY")
            .and_then(Property::as_integer)
        {
            let priority = maps::validate_priority(priority)?;
            item.properties.set(
                tags::IMPORTANCE,
                PropValue::Int32(maps::priority_to_importance(priority)),
            );
        }
        if let Some(categories) = component
            .get_property("CATEGORIES")
            .and_then(Property::as_text)
        {
            let list: Vec<String> = categories
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
            if !list.is_empty() {
                item.properties
                    .set(tags::CATEGORIES, PropValue::MultiString(list));
            }
        }

        Ok(())
    }

    fn add_times(
        &self,
        component: &Component,
        item: &mut CalendarItem,
        ctx: &ConvertContext<'_>,
    ) -> ConvertResult<()> {
        let dtstart = component
            .get_property("DTSTART")
            .ok_or_else(|| ConvertError::NotFound("DTSTART".to_string()))?;
        let start_local = local_datetime(dtstart, &ctx.current_timezone)?;

        let end_local = if let Some(end_prop) = component.get_property("DTEND") {
            local_datetime(end_prop, &ctx.current_timezone)?
        } else if let Some(duration) = component
            .get_property("DURATION")
            .and_then(Property::as_duration)
        {
            start_local + Duration::minutes(duration.total_minutes())
        } else if matches!(dtstart.value, Value::Date(_)) {
            start_local + Duration::days(1)
        } else {
            start_local
        };

        let all_day = is_all_day(dtstart, start_local, end_local);

        let start_utc = ctx.current_timezone.local_to_utc(start_local);
        let end_utc = ctx.current_timezone.local_to_utc(end_local);

        item.properties
            .set(tags::APPT_START_WHOLE, PropValue::SysTime(start_utc));
        item.properties
            .set(tags::APPT_END_WHOLE, PropValue::SysTime(end_utc));
        item.properties.set(
            tags::APPT_DURATION,
            PropValue::Int32(
                i32::try_from((end_utc - start_utc).num_minutes()).unwrap_or(i32::MAX),
            ),
        );
        item.properties
            .set(tags::APPT_ALL_DAY, PropValue::Bool(all_day));

        Ok(())
    }

    fn set_item_specifics(
        &self,
        component: &Component,
        item: &mut CalendarItem,
        ctx: &ConvertContext<'_>,
    ) -> ConvertResult<()> {
        let busy = maps::busy_status_from_component(component);
        item.properties
            .set(tags::APPT_BUSY_STATUS, PropValue::Int32(busy));

        if let Some(intended) = component
            .get_property("X-MICROSOFT-CDO-INTENDEDSTATUS")
            .and_then(Property::as_text)
        {
            item.properties.set(
                tags::APPT_INTENDED_BUSY_STATUS,
                PropValue::Int32(maps::busy_status_code(intended)),
            );
        }

        let has_attendees = !component.get_properties("ATTENDEE").is_empty();
        item.properties.set(
            tags::APPT_MEETING_STATUS,
            PropValue::Int32(maps::meeting_status(ctx.method.as_deref(), has_attendees)),
        );

        Ok(())
    }
}

/// All-day: DATE-valued DTSTART, or a local midnight-to-midnight span.
fn is_all_day(dtstart: &Property, start: NaiveDateTime, end: NaiveDateTime) -> bool {
    if matches!(dtstart.value, Value::Date(_)) {
        return true;
    }
    start.num_seconds_from_midnight() == 0
        && end.num_seconds_from_midnight() == 0
        && end > start
}

/// Emits the time/base properties of a VEVENT from a store item.
pub(crate) fn emit_event(item: &CalendarItem, base: &mut Component) -> ConvertResult<()> {
    let start = item
        .properties
        .systime(tags::APPT_START_WHOLE)
        .ok_or_else(|| ConvertError::NotFound("appointment start".to_string()))?;
    let end = item
        .properties
        .systime(tags::APPT_END_WHOLE)
        .unwrap_or(start);
    let all_day = item.properties.bool(tags::APPT_ALL_DAY) == Some(true);

    emit_times(base, "DTSTART", start, item, all_day)?;
    emit_times(base, "DTEND", end, item, all_day)?;

    if let Some(subject) = item.properties.string(tags::SUBJECT) {
        base.add_property(Property::text("SUMMARY", subject));
    }
    if let Some(location) = item.properties.string(tags::APPT_LOCATION) {
        base.add_property(Property::text("LOCATION", location));
    }
    if let Some(body) = item.properties.string(tags::BODY) {
        base.add_property(Property::text("DESCRIPTION", body));
    }
    if let Some(sensitivity) = item.properties.i32(tags::SENSITIVITY) {
        base.add_property(Property::text(
            "CLASS",
            maps::sensitivity_to_class(sensitivity),
        ));
    }
    if let Some(importance) = item.properties.i32(tags::IMPORTANCE) {
        base.add_property(Property::integer(
            "PRIORITY",
            maps::importance_to_priority(importance),
        ));
    }
    if let Some(PropValue::MultiString(categories)) = item.properties.get(tags::CATEGORIES) {
        base.add_property(Property::text("CATEGORIES", categories.join(",")));
    }

    let busy = item.properties.i32(tags::APPT_BUSY_STATUS).unwrap_or(2);
    base.add_property(Property::text(
        "TRANSP",
        if busy == 0 { "TRANSPARENT" } else { "OPAQUE" },
    ));
    base.add_property(Property::text(
        "X-MICROSOFT-CDO-BUSYSTATUS",
        maps::busy_status_token(busy),
    ));

    Ok(())
}

/// Emits one DTSTART/DTEND property in the item's timezone, as a DATE
/// for all-day items.
pub(crate) fn emit_times(
    base: &mut Component,
    name: &str,
    utc: chrono::DateTime<chrono::Utc>,
    item: &CalendarItem,
    all_day: bool,
) -> ConvertResult<()> {
    let local = item.timezone.utc_to_local(utc);

    if all_day {
        base.add_property(Property::date(name, Date::from_naive(local.date())));
        return Ok(());
    }

    if item.timezone == TimezoneRule::utc() {
        base.add_property(Property::datetime(name, IcalDateTime::from_utc(utc)));
    } else {
        // The zoned form carries its TZID as a parameter
        base.add_property(Property::datetime(
            name,
            IcalDateTime::zoned(&item.timezone_name, local),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn all_day_detection_by_date_value() {
        let prop = Property::date("DTSTART", Date::new(2026, 3, 2));
        let start = NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert!(is_all_day(&prop, start, start + Duration::days(1)));
    }

    #[test]
    fn all_day_detection_by_midnight_span() {
        let prop = Property::datetime("DTSTART", IcalDateTime::utc(2026, 3, 2, 0, 0, 0));
        let start = NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert!(is_all_day(&prop, start, start + Duration::days(1)));
        assert!(!is_all_day(
            &prop,
            start,
            start + Duration::hours(1)
        ));
    }
}
