//! VTODO-specific conversion hooks.

use dovetail_core::{ConvertResult, PropValue, tags};
use dovetail_rfc::ical::core::{Component, DateTime as IcalDateTime, Property};

use super::{ConvertContext, ItemSpecifics, maps};
use crate::item::{CalendarItem, ItemKind};
use crate::recurrence::local_datetime;

pub(crate) struct TaskSpecifics;

impl ItemSpecifics for TaskSpecifics {
    fn kind(&self) -> ItemKind {
        ItemKind::Task
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
        Ok(())
    }

    fn add_times(
        &self,
        component: &Component,
        item: &mut CalendarItem,
        ctx: &ConvertContext<'_>,
    ) -> ConvertResult<()> {
        // Tasks may omit DTSTART entirely; nothing is mandatory here
        // unless the task recurs (the recurrence step enforces that).
        if let Some(start) = component.get_property("DTSTART") {
            let local = local_datetime(start, &ctx.current_timezone)?;
            item.properties.set(
                tags::TASK_START_DATE,
                PropValue::SysTime(ctx.current_timezone.local_to_utc(local)),
            );
        }
        if let Some(due) = component.get_property("DUE") {
            let local = local_datetime(due, &ctx.current_timezone)?;
            item.properties.set(
                tags::TASK_DUE_DATE,
                PropValue::SysTime(ctx.current_timezone.local_to_utc(local)),
            );
        }
        if let Some(completed) = component.get_property("COMPLETED") {
            let local = local_datetime(completed, &ctx.current_timezone)?;
            item.properties.set(
                tags::TASK_DATE_COMPLETED,
                PropValue::SysTime(ctx.current_timezone.local_to_utc(local)),
            );
        }
        Ok(())
    }

    fn set_item_specifics(
        &self,
        component: &Component,
        item: &mut CalendarItem,
        _ctx: &ConvertContext<'_>,
    ) -> ConvertResult<()> {
        let status = component
            .get_property("STATUS")
            .and_then(Property::as_text)
            .map_or(0, maps::task_status_code);
        item.properties
            .set(tags::TASK_STATUS, PropValue::Int32(status));
        item.properties
            .set(tags::TASK_COMPLETE, PropValue::Bool(status == 2));

        let percent = match component
            .get_property("PERCENT-COMPLETE")
            .and_then(Property::as_integer)
        {
            Some(p) => maps::validate_percent(p)?,
            None => {
                if status == 2 {
                    100
                } else {
                    0
                }
            }
        };
        item.properties.set(
            tags::TASK_PERCENT_COMPLETE,
            PropValue::Float(f64::from(percent) / 100.0),
        );

        Ok(())
    }
}

/// Emits the time/base properties of a VTODO from a store item.
pub(crate) fn emit_task(item: &CalendarItem, base: &mut Component) -> ConvertResult<()> {
    if let Some(subject) = item.properties.string(tags::SUBJECT) {
        base.add_property(Property::text("SUMMARY", subject));
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

    emit_task_time(item, base, "DTSTART", tags::TASK_START_DATE);
    emit_task_time(item, base, "DUE", tags::TASK_DUE_DATE);
    emit_task_time(item, base, "COMPLETED", tags::TASK_DATE_COMPLETED);

    let status = item.properties.i32(tags::TASK_STATUS).unwrap_or(0);
    base.add_property(Property::text("STATUS", maps::task_status_token(status)));

    if let Some(fraction) = item.properties.f64(tags::TASK_PERCENT_COMPLETE) {
        #[expect(clippy::cast_possible_truncation, reason = "clamped to 0..=100")]
        let percent = (fraction * 100.0).round().clamp(0.0, 100.0) as i32;
        base.add_property(Property::integer("PERCENT-COMPLETE", percent));
    }

    Ok(())
}

fn emit_task_time(item: &CalendarItem, base: &mut Component, name: &str, tag: u32) {
    if let Some(stamp) = item.properties.systime(tag) {
        base.add_property(Property::datetime(name, IcalDateTime::from_utc(stamp)));
    }
}
