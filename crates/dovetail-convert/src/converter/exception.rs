//! Modified-occurrence (exception) handling.
//!
//! A component carrying RECURRENCE-ID is never a series of its own; it
//! modifies one occurrence of the base item with the same series
//! identity. Parse-side, the exception claims a slot in the base
//! descriptor's modified-occurrence table and produces a sub-message
//! with copied-forward properties. Emit-side, each modified occurrence
//! becomes a clone of the base component with the exception-invalid
//! fields stripped and only the overridden fields applied.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use dovetail_core::{ConvertError, ConvertResult, ConverterSettings, PropValue, tags};
use dovetail_rfc::ical::core::{Component, Property, Value};

use super::event::emit_times;
use super::maps;
use crate::globalid::{GlobalId, InstanceDate};
use crate::item::{CalendarItem, Exception};
use crate::recurrence::{
    ModifiedOccurrence, OccurrenceIter, local_datetime, overrides,
};

/// Fields a clone must shed before becoming an exception component.
const EXCEPTION_INVALID_FIELDS: [&str; 5] = ["DTSTART", "DTEND", "RRULE", "EXDATE", "CLASS"];

/// Folds an exception component into its base item.
///
/// ## Errors
/// - `InvalidObject` if the base item is not recurring, or if the
///   claimed base date does not match exactly one enumerated occurrence
/// - `NotFound`/`CorruptData` for a missing or damaged RECURRENCE-ID
pub fn attach_exception(
    base: &mut CalendarItem,
    component: &Component,
    settings: &ConverterSettings,
) -> ConvertResult<()> {
    let tz = base.timezone;
    let cap = settings.max_occurrences;

    let recurrence_id = component
        .recurrence_id()
        .ok_or_else(|| ConvertError::NotFound("RECURRENCE-ID".to_string()))?;
    let claimed_local = local_datetime(recurrence_id, &tz)?;

    let (start_offset, end_offset) = {
        let desc = base.recurrence.as_ref().ok_or_else(|| {
            ConvertError::InvalidObject("exception against a non-recurring item".to_string())
        })?;

        // Exactly one occurrence must fall in the claimed day window
        if !crate::recurrence::occurs_on_day(desc, claimed_local.date(), cap) {
            return Err(ConvertError::InvalidObject(format!(
                "no occurrence on {}",
                claimed_local.date()
            )));
        }
        (
            desc.start_time_offset_minutes,
            desc.end_time_offset_minutes,
        )
    };

    let midnight = claimed_local
        .date()
        .and_hms_opt(0, 0, 0)
        .unwrap_or(claimed_local);
    let base_local = midnight + Duration::minutes(i64::from(start_offset));
    let default_end = midnight + Duration::minutes(i64::from(end_offset));

    let mut modified = ModifiedOccurrence {
        base: base_local,
        start: base_local,
        end: default_end,
        ..ModifiedOccurrence::default()
    };

    if let Some(start_prop) = component.get_property("DTSTART") {
        let start = local_datetime(start_prop, &tz)?;
        if start != base_local {
            modified.override_flags |= overrides::START;
        }
        modified.start = start;
        modified.end = start + (default_end - base_local);
    }
    if let Some(end_prop) = component.get_property("DTEND") {
        let end = local_datetime(end_prop, &tz)?;
        if end != default_end {
            modified.override_flags |= overrides::END;
        }
        modified.end = end;
    }

    let mut message_properties = copy_forward(base);

    // Explicit exception properties overwrite the copied-forward set
    if let Some(subject) = component.summary() {
        modified.override_flags |= overrides::SUBJECT;
        modified.subject = Some(subject.to_string());
        message_properties.set(tags::SUBJECT, PropValue::String(subject.to_string()));
    }
    if let Some(location) = component.location() {
        modified.override_flags |= overrides::LOCATION;
        modified.location = Some(location.to_string());
        message_properties.set(tags::APPT_LOCATION, PropValue::String(location.to_string()));
    }
    if let Some(body) = component.description() {
        modified.override_flags |= overrides::BODY;
        message_properties.set(tags::BODY, PropValue::String(body.to_string()));
    }
    if component.get_property("TRANSP").is_some()
        || component.get_property("X-MICROSOFT-CDO-BUSYSTATUS").is_some()
    {
        let busy = maps::busy_status_from_component(component);
        modified.override_flags |= overrides::BUSY_STATUS;
        modified.busy_status = Some(busy);
        message_properties.set(tags::APPT_BUSY_STATUS, PropValue::Int32(busy));
    }
    if let Some(dtstart) = component.get_property("DTSTART")
        && matches!(dtstart.value, Value::Date(_))
    {
        modified.override_flags |= overrides::ALL_DAY;
        modified.all_day = Some(true);
        message_properties.set(tags::APPT_ALL_DAY, PropValue::Bool(true));
    }
    if let Some(alarm_component) = component.alarms().first() {
        let reminder = crate::alarm::alarm_to_reminder(
            alarm_component,
            Some(tz.local_to_utc(modified.start)),
            settings.default_reminder_minutes,
        );
        modified.override_flags |= overrides::REMINDER_DELTA | overrides::REMINDER_SET;
        modified.reminder_delta = Some(reminder.minutes_before);
        modified.reminder_set = Some(reminder.is_set);
        message_properties.set(tags::REMINDER_SET, PropValue::Bool(reminder.is_set));
        message_properties.set(
            tags::REMINDER_DELTA,
            PropValue::Int32(i32::try_from(reminder.minutes_before).unwrap_or(i32::MAX)),
        );
    }

    let base_date_utc = DateTime::from_naive_utc_and_offset(midnight, Utc);

    let mut attachment_properties = dovetail_core::PropertyBag::new();
    attachment_properties.set(tags::IS_EXCEPTION, PropValue::Bool(true));
    attachment_properties.set(
        tags::EXCEPTION_REPLACE_TIME,
        PropValue::SysTime(base_date_utc),
    );

    // The exception's own identifier carries the instance date; its
    // clean form stays the shared series key.
    if let Some(goid_bytes) = base.properties.binary(tags::GLOBAL_ID)
        && let Ok(goid) = GlobalId::decode(goid_bytes)
    {
        let stamped = goid.with_instance_date(InstanceDate::from_utc_date(base_date_utc));
        message_properties.set(tags::GLOBAL_ID, PropValue::Binary(stamped.encode()));
        message_properties.set(
            tags::CLEAN_GLOBAL_ID,
            PropValue::Binary(stamped.clean().encode()),
        );
    }

    let start_utc = tz.local_to_utc(modified.start);
    let end_utc = tz.local_to_utc(modified.end);
    let slot = base
        .recurrence
        .as_mut()
        .map_or(0, |desc| desc.add_modified_occurrence(modified));

    let exception = Exception {
        base_date: Some(base_date_utc),
        start_date: Some(start_utc),
        end_date: Some(end_utc),
        attachment_properties,
        message_properties,
        recipients: Vec::new(),
    };

    let insert_at = slot.min(base.exceptions.len());
    base.exceptions.insert(insert_at, exception);

    // Keep the persisted blob in step with the descriptor
    if let Some(desc) = base.recurrence.as_ref() {
        let state_tag = match base.kind {
            crate::item::ItemKind::Event => tags::APPT_RECURRENCE_STATE,
            crate::item::ItemKind::Task => tags::TASK_RECURRENCE_STATE,
        };
        base.properties.set(
            state_tag,
            PropValue::Binary(crate::recurrence::encode_state(desc, base.kind)),
        );
    }

    Ok(())
}

/// The copy-forward property set: values an exception inherits from the
/// base item unless it overrides them. Body, label, and reminder are
/// defined to never propagate.
fn copy_forward(base: &CalendarItem) -> dovetail_core::PropertyBag {
    let mut bag = dovetail_core::PropertyBag::new();
    for tag in [
        tags::SUBJECT,
        tags::APPT_LOCATION,
        tags::APPT_ALL_DAY,
        tags::APPT_BUSY_STATUS,
    ] {
        if let Some(value) = base.properties.get(tag) {
            bag.set(tag, value.clone());
        }
    }
    bag
}

/// Emits one component per modified occurrence: the base component
/// cloned, stripped of exception-invalid fields, stamped with the
/// recurrence identity, and overlaid with the overridden fields.
pub fn exception_components(
    item: &CalendarItem,
    base_component: &Component,
    desc: &crate::recurrence::RecurrenceDescriptor,
) -> ConvertResult<Vec<Component>> {
    let mut components = Vec::with_capacity(desc.modified_occurrences.len());

    for modified in &desc.modified_occurrences {
        let mut exception = base_component.clone();
        for field in EXCEPTION_INVALID_FIELDS {
            exception.remove_properties(field);
        }
        exception.children.clear();

        // Recurrence identity carries the original occurrence date
        let base_utc = item.timezone.local_to_utc(modified.base);
        emit_times(&mut exception, "RECURRENCE-ID", base_utc, item, false)?;

        emit_times(
            &mut exception,
            "DTSTART",
            item.timezone.local_to_utc(modified.start),
            item,
            modified.all_day == Some(true),
        )?;
        emit_times(
            &mut exception,
            "DTEND",
            item.timezone.local_to_utc(modified.end),
            item,
            modified.all_day == Some(true),
        )?;

        if modified.override_flags & overrides::SUBJECT != 0
            && let Some(subject) = &modified.subject
        {
            exception.remove_properties("SUMMARY");
            exception.add_property(Property::text("SUMMARY", subject));
        }
        if modified.override_flags & overrides::LOCATION != 0
            && let Some(location) = &modified.location
        {
            exception.remove_properties("LOCATION");
            exception.add_property(Property::text("LOCATION", location));
        }
        if modified.override_flags & overrides::BUSY_STATUS != 0
            && let Some(busy) = modified.busy_status
        {
            exception.remove_properties("TRANSP");
            exception.remove_properties("X-MICROSOFT-CDO-BUSYSTATUS");
            exception.add_property(Property::text(
                "TRANSP",
                if busy == 0 { "TRANSPARENT" } else { "OPAQUE" },
            ));
            exception.add_property(Property::text(
                "X-MICROSOFT-CDO-BUSYSTATUS",
                maps::busy_status_token(busy),
            ));
        }

        components.push(exception);
    }

    Ok(components)
}

/// Enumerates the occurrences of an item's series within a window; the
/// public entry the front ends use for expansion.
#[must_use]
pub fn expand_occurrences<'a>(
    desc: &'a crate::recurrence::RecurrenceDescriptor,
    tz: &'a crate::timezone::TimezoneRule,
    from: chrono::NaiveDate,
    to: chrono::NaiveDate,
    cap: u32,
) -> OccurrenceIter<'a> {
    OccurrenceIter::new(desc, tz, from, to, cap)
}

/// Local start of an exception's original occurrence, for correlating
/// its global identifier instance date.
#[must_use]
pub fn exception_base_local(exception: &Exception, tz: &crate::timezone::TimezoneRule) -> Option<NaiveDateTime> {
    exception.base_date.map(|utc| tz.utc_to_local(utc))
}
