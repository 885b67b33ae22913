//! Event/Task converters: full VEVENT/VTODO ⇄ property-bag translation.
//!
//! The two item kinds share one orchestration path; everything that
//! differs between them goes through the small [`ItemSpecifics`] trait
//! (base properties, times, item specifics) instead of a deep converter
//! hierarchy. Free/busy is deliberately not part of this dispatch; see
//! [`freebusy`].
//!
//! Batch semantics: a parse-side failure on one component is recorded
//! and that component is skipped; an emit-side failure aborts only the
//! item being emitted. The batch never fails wholesale for either.

mod event;
mod exception;
pub mod freebusy;
mod maps;
mod task;

pub use exception::{
    attach_exception, exception_base_local, exception_components, expand_occurrences,
};
pub use maps::{
    busy_status_from_component, class_to_sensitivity, importance_to_priority,
    priority_to_importance, sensitivity_to_class,
};

use chrono::{DateTime, Utc};
use dovetail_core::{ConvertError, ConvertResult, ConverterSettings, PropValue, tags};
use dovetail_rfc::ical::build::serialize;
use dovetail_rfc::ical::core::{Component, ComponentKind, ICalendar, Parameter, Property};
use dovetail_rfc::ical::parse::parse;

use crate::alarm::{self, Reminder};
use crate::directory::{Directory, RecipientQuery};
use crate::globalid::GlobalId;
use crate::item::{
    CalendarItem, ConversionBatch, ItemError, ItemKind, Recipient, RecipientRole, TrackStatus,
};
use crate::recurrence::{
    self, RecurrenceDescriptor, decode_state, descriptor_to_rrule, encode_state,
    rrule_to_descriptor,
};
use crate::timezone::{
    ResolvedTimezone, TimezoneResolver, TimezoneRule, encode_raw_struct, rule_to_vtimezone,
    vtimezone_to_rule,
};

use event::EventSpecifics;
use task::TaskSpecifics;

/// Per-item conversion context, threaded explicitly through every hook.
pub(crate) struct ConvertContext<'a> {
    /// Timezone of the item being converted, resolved before any
    /// recurrence processing starts.
    pub current_timezone: TimezoneRule,
    pub timezone_name: String,
    pub settings: &'a ConverterSettings,
    pub method: Option<String>,
}

/// The hooks that differ between event and task conversion.
pub(crate) trait ItemSpecifics {
    fn kind(&self) -> ItemKind;

    /// Subject, body, categories, classification.
    fn add_base_properties(
        &self,
        component: &Component,
        item: &mut CalendarItem,
        ctx: &ConvertContext<'_>,
    ) -> ConvertResult<()>;

    /// Start/end (or due) times including all-day handling.
    fn add_times(
        &self,
        component: &Component,
        item: &mut CalendarItem,
        ctx: &ConvertContext<'_>,
    ) -> ConvertResult<()>;

    /// Kind-specific state: busy/meeting status, task progress.
    fn set_item_specifics(
        &self,
        component: &Component,
        item: &mut CalendarItem,
        ctx: &ConvertContext<'_>,
    ) -> ConvertResult<()>;
}

/// The conversion engine. One instance per session; the timezone cache
/// inside is the only state carried across items.
pub struct Converter<'a, D: Directory> {
    settings: &'a ConverterSettings,
    directory: &'a D,
    timezones: TimezoneResolver,
}

impl<'a, D: Directory> Converter<'a, D> {
    #[must_use]
    pub fn new(settings: &'a ConverterSettings, directory: &'a D) -> Self {
        Self {
            settings,
            directory,
            timezones: TimezoneResolver::new(),
        }
    }

    /// Converts an iCalendar payload into store items.
    ///
    /// ## Errors
    /// Fails only for structurally unusable payloads; per-component
    /// failures are recorded in the returned batch.
    #[tracing::instrument(skip(self, input), fields(input_len = input.len()))]
    pub fn ical_to_items(&mut self, input: &str) -> ConvertResult<ConversionBatch> {
        let ical = parse(input).map_err(|e| ConvertError::CorruptData(e.to_string()))?;

        for tz_component in ical.timezones() {
            match vtimezone_to_rule(tz_component) {
                Ok((name, rule)) => self.timezones.register(&name, rule),
                Err(e) => tracing::warn!(error = %e, "skipping unusable VTIMEZONE"),
            }
        }

        let method = ical.method().map(str::to_ascii_uppercase);
        let mut batch = ConversionBatch::default();

        // Base series first; exception components need their parent.
        let mut pending_exceptions = Vec::new();
        for (index, component) in ical.items().into_iter().enumerate() {
            if component.recurrence_id().is_some() {
                pending_exceptions.push((index, component));
                continue;
            }
            match self.convert_component(component, method.as_deref()) {
                Ok(item) => batch.items.push(item),
                Err(error) => {
                    tracing::warn!(index, error = %error, "component skipped");
                    batch.errors.push(ItemError {
                        index,
                        uid: component.uid().map(str::to_string),
                        error,
                    });
                }
            }
        }

        for (index, component) in pending_exceptions {
            if let Err(error) = self.attach_exception_component(&mut batch.items, component) {
                tracing::warn!(index, error = %error, "exception skipped");
                batch.errors.push(ItemError {
                    index,
                    uid: component.uid().map(str::to_string),
                    error,
                });
            }
        }

        Ok(batch)
    }

    /// Locates the base item for an exception component by series guid
    /// and folds the exception into it.
    fn attach_exception_component(
        &mut self,
        items: &mut [CalendarItem],
        component: &Component,
    ) -> ConvertResult<()> {
        let uid = component
            .uid()
            .ok_or_else(|| ConvertError::NotFound("exception without UID".to_string()))?;
        let series_guid = GlobalId::from_uid(uid, None).clean().encode();

        let base = items
            .iter_mut()
            .find(|item| item.series_guid == series_guid)
            .ok_or_else(|| {
                ConvertError::InvalidObject(format!("exception {uid} has no base item"))
            })?;

        attach_exception(base, component, self.settings)
    }

    /// Converts one VEVENT/VTODO into a store item.
    fn convert_component(
        &mut self,
        component: &Component,
        method: Option<&str>,
    ) -> ConvertResult<CalendarItem> {
        let specifics: &dyn ItemSpecifics = match component.kind {
            Some(ComponentKind::Event) => &EventSpecifics,
            Some(ComponentKind::Todo) => &TaskSpecifics,
            _ => {
                return Err(ConvertError::InvalidObject(format!(
                    "cannot convert {} to a store item",
                    component.name
                )));
            }
        };

        let mut item = CalendarItem::new(specifics.kind());

        // Timezone first: recurrence and time conversion depend on it
        let resolved = self.resolve_component_timezone(component);
        let ctx = ConvertContext {
            current_timezone: resolved.rule,
            timezone_name: resolved.name,
            settings: self.settings,
            method: method.map(str::to_string),
        };
        item.timezone = ctx.current_timezone;
        item.timezone_name.clone_from(&ctx.timezone_name);

        self.add_identity(component, &mut item)?;
        specifics.add_base_properties(component, &mut item, &ctx)?;
        specifics.add_times(component, &mut item, &ctx)?;
        self.add_recurrence(component, &mut item, &ctx)?;
        specifics.set_item_specifics(component, &mut item, &ctx)?;
        self.add_reminder(component, &mut item);
        self.add_recipients(component, &mut item);

        Ok(item)
    }

    /// Resolves the timezone governing a component's local times.
    ///
    /// Without a TZID the configured floating timezone applies, then the
    /// UTC fallback.
    fn resolve_component_timezone(&mut self, component: &Component) -> ResolvedTimezone {
        let tzid = component
            .get_property("DTSTART")
            .or_else(|| component.get_property("DUE"))
            .and_then(|p| p.get_param_value("TZID"))
            .or(self.settings.floating_timezone.as_deref());

        let year = component
            .dtstart()
            .map_or(2026, |dt| i32::from(dt.year));

        self.timezones.resolve_with_fallback(tzid, None, None, year)
    }

    /// UID → global/clean identifier pair and message class.
    fn add_identity(&self, component: &Component, item: &mut CalendarItem) -> ConvertResult<()> {
        item.properties.set(
            tags::MESSAGE_CLASS,
            PropValue::String(item.kind.message_class().to_string()),
        );

        let created = component
            .get_property("DTSTAMP")
            .and_then(Property::as_datetime)
            .and_then(|dt| dt.to_naive())
            .map(|n| DateTime::from_naive_utc_and_offset(n, Utc));

        let uid = component.uid().map_or_else(
            || uuid::Uuid::new_v4().to_string(),
            str::to_string,
        );

        let goid = GlobalId::from_uid(&uid, created);
        // The series key must be stable across every occurrence AND
        // every stamping of the same UID, so it is derived without the
        // creation time and with a zeroed instance date.
        item.series_guid = GlobalId::from_uid(&uid, None).clean().encode();
        item.properties
            .set(tags::GLOBAL_ID, PropValue::Binary(goid.encode()));
        item.properties
            .set(tags::CLEAN_GLOBAL_ID, PropValue::Binary(item.series_guid.clone()));

        if let Some(last_modified) = component
            .get_property("LAST-MODIFIED")
            .and_then(Property::as_datetime)
            .and_then(|dt| dt.to_naive())
        {
            let stamp = DateTime::from_naive_utc_and_offset(last_modified, Utc);
            item.last_modified = Some(stamp);
            item.properties
                .set(tags::LAST_MODIFICATION_TIME, PropValue::SysTime(stamp));
        }
        if let Some(created) = created {
            item.properties
                .set(tags::CREATION_TIME, PropValue::SysTime(created));
        }

        Ok(())
    }

    /// RRULE → descriptor, blob, and the recurrence-adjacent properties.
    fn add_recurrence(
        &self,
        component: &Component,
        item: &mut CalendarItem,
        ctx: &ConvertContext<'_>,
    ) -> ConvertResult<()> {
        if component.get_property("RRULE").is_none() {
            return Ok(());
        }

        let desc = rrule_to_descriptor(
            component,
            &ctx.current_timezone,
            ctx.settings.max_occurrences,
        )?;

        let (state_tag, recurring_tag) = match item.kind {
            ItemKind::Event => (tags::APPT_RECURRENCE_STATE, tags::APPT_RECURRING),
            ItemKind::Task => (tags::TASK_RECURRENCE_STATE, tags::TASK_IS_RECURRING),
        };

        item.properties
            .set(state_tag, PropValue::Binary(encode_state(&desc, item.kind)));
        item.properties.set(recurring_tag, PropValue::Bool(true));
        item.properties.set(
            tags::APPT_RECURRENCE_PATTERN,
            PropValue::String(desc.summary.clone()),
        );
        item.properties.set(
            tags::APPT_TIMEZONE_STRUCT,
            PropValue::Binary(encode_raw_struct(&ctx.current_timezone)),
        );
        item.properties.set(
            tags::APPT_TIMEZONE_DESC,
            PropValue::String(ctx.timezone_name.clone()),
        );
        item.properties.set(
            tags::APPT_CLIP_START,
            PropValue::SysTime(ctx.current_timezone.local_to_utc(desc.start_date)),
        );
        item.properties.set(
            tags::APPT_CLIP_END,
            PropValue::SysTime(ctx.current_timezone.local_to_utc(desc.end_date)),
        );

        item.recurrence = Some(desc);
        Ok(())
    }

    /// First VALARM plus the component-level snooze extensions.
    fn add_reminder(&self, component: &Component, item: &mut CalendarItem) {
        let start = item.properties.systime(match item.kind {
            ItemKind::Event => tags::APPT_START_WHOLE,
            ItemKind::Task => tags::TASK_START_DATE,
        });

        let Some(alarm_component) = component.alarms().first().copied() else {
            item.properties
                .set(tags::REMINDER_SET, PropValue::Bool(false));
            return;
        };

        let mut reminder = alarm::alarm_to_reminder(
            alarm_component,
            start,
            self.settings.default_reminder_minutes,
        );
        for prop in &component.properties {
            alarm::apply_extension(&mut reminder, prop);
        }

        item.properties
            .set(tags::REMINDER_SET, PropValue::Bool(reminder.is_set));
        item.properties.set(
            tags::REMINDER_DELTA,
            PropValue::Int32(i32::try_from(reminder.minutes_before).unwrap_or(i32::MAX)),
        );
        if let Some(signal) = reminder.reminder_time {
            item.properties
                .set(tags::REMINDER_TIME, PropValue::SysTime(signal));
        }
        if let Some(snooze) = reminder.snooze_time {
            item.properties
                .set(tags::REMINDER_SNOOZE_TIME, PropValue::SysTime(snooze));
        }
        if let Some(ack) = reminder.acknowledged {
            item.properties
                .set(tags::REMINDER_ACK_TIME, PropValue::SysTime(ack));
        }
    }

    /// ORGANIZER/ATTENDEE lines through the directory collaborator;
    /// directory failure degrades every entry to a one-off.
    fn add_recipients(&self, component: &Component, item: &mut CalendarItem) {
        let mut queries = Vec::new();

        if let Some(organizer) = component.get_property("ORGANIZER") {
            queries.push(recipient_query(organizer, RecipientRole::Organizer));
        }
        for attendee in component.get_properties("ATTENDEE") {
            let role = match attendee.get_param_value("ROLE") {
                Some(role) if role.eq_ignore_ascii_case("OPT-PARTICIPANT") => RecipientRole::Cc,
                Some(role) if role.eq_ignore_ascii_case("NON-PARTICIPANT") => RecipientRole::Bcc,
                _ => RecipientRole::To,
            };
            queries.push(recipient_query(attendee, role));
        }

        if queries.is_empty() {
            return;
        }

        let mut resolved = match self.directory.resolve_recipients(&queries) {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!(error = %e, "directory unavailable, using one-off recipients");
                queries
                    .iter()
                    .map(|q| Recipient::one_off(q.role_hint, &q.email, &q.display_name))
                    .collect()
            }
        };

        // Tracking status comes from the wire, not the directory
        let statuses: Vec<TrackStatus> = component
            .get_property("ORGANIZER")
            .map(|_| TrackStatus::Organized)
            .into_iter()
            .chain(component.get_properties("ATTENDEE").iter().map(|a| {
                a.get_param_value("PARTSTAT")
                    .map_or(TrackStatus::NotResponded, TrackStatus::from_partstat)
            }))
            .collect();
        for (recipient, status) in resolved.iter_mut().zip(statuses) {
            recipient.track_status = status;
        }

        item.recipients = resolved;
    }

    /// Converts store items back to a serialized iCalendar payload.
    ///
    /// Emit-time errors abort only the affected item.
    #[tracing::instrument(skip(self, items), fields(count = items.len()))]
    pub fn items_to_ical(
        &mut self,
        items: &[CalendarItem],
        method: Option<&str>,
    ) -> (String, Vec<ItemError>) {
        let mut ical = ICalendar::new(self.settings.prodid.clone());
        if let Some(method) = method {
            ical.set_method(method);
        }

        let mut errors = Vec::new();
        let mut emitted_timezones: Vec<String> = Vec::new();

        for (index, item) in items.iter().enumerate() {
            match self.item_to_components(item) {
                Ok(components) => {
                    if item.timezone != TimezoneRule::utc()
                        && !emitted_timezones.contains(&item.timezone_name)
                    {
                        ical.add_component(rule_to_vtimezone(&item.timezone_name, &item.timezone));
                        emitted_timezones.push(item.timezone_name.clone());
                    }
                    for component in components {
                        ical.add_component(component);
                    }
                }
                Err(error) => {
                    tracing::warn!(index, error = %error, "item emission aborted");
                    errors.push(ItemError {
                        index,
                        uid: None,
                        error,
                    });
                }
            }
        }

        (serialize(&ical), errors)
    }

    /// Builds the base component plus one component per exception.
    fn item_to_components(&mut self, item: &CalendarItem) -> ConvertResult<Vec<Component>> {
        // Items loaded straight from the store carry their recurrence
        // only as a blob; decode failure means non-recurring.
        let descriptor: Option<RecurrenceDescriptor> = match &item.recurrence {
            Some(desc) => Some(desc.clone()),
            None => {
                let state_tag = match item.kind {
                    ItemKind::Event => tags::APPT_RECURRENCE_STATE,
                    ItemKind::Task => tags::TASK_RECURRENCE_STATE,
                };
                item.properties.binary(state_tag).and_then(|bytes| {
                    match decode_state(bytes, item.kind) {
                        Ok(desc) => Some(desc),
                        Err(e) => {
                            tracing::warn!(error = %e, "recurrence blob unreadable, emitting non-recurring");
                            None
                        }
                    }
                })
            }
        };

        let mut base = match item.kind {
            ItemKind::Event => Component::event(),
            ItemKind::Task => Component::todo(),
        };

        let goid = item
            .properties
            .binary(tags::GLOBAL_ID)
            .map_or_else(
                || GlobalId::from_uid(&uuid::Uuid::new_v4().to_string(), None),
                |bytes| {
                    GlobalId::decode(bytes).unwrap_or_else(|_| {
                        GlobalId::from_uid(&uuid::Uuid::new_v4().to_string(), None)
                    })
                },
            );
        base.add_property(Property::text("UID", wire_uid(&goid)));

        if let Some(stamp) = item.properties.systime(tags::CREATION_TIME) {
            base.add_property(Property::datetime(
                "DTSTAMP",
                dovetail_rfc::ical::core::DateTime::from_utc(stamp),
            ));
        }
        if let Some(modified) = item.last_modified.or_else(|| {
            item.properties.systime(tags::LAST_MODIFICATION_TIME)
        }) {
            base.add_property(Property::datetime(
                "LAST-MODIFIED",
                dovetail_rfc::ical::core::DateTime::from_utc(modified),
            ));
        }

        match item.kind {
            ItemKind::Event => event::emit_event(item, &mut base)?,
            ItemKind::Task => task::emit_task(item, &mut base)?,
        }

        if let Some(desc) = &descriptor {
            let rrule = descriptor_to_rrule(desc, &item.timezone)?;
            base.add_property(Property::recur("RRULE", rrule));

            for utc in recurrence::deleted_occurrence_utcs(desc, &item.timezone) {
                base.add_property(Property::datetime(
                    "EXDATE",
                    dovetail_rfc::ical::core::DateTime::from_utc(utc),
                ));
            }
        }

        self.emit_reminder(item, &mut base);
        emit_recipients(item, &mut base);

        let mut components = vec![base.clone()];
        if let Some(desc) = &descriptor {
            components.extend(exception_components(item, &base, desc)?);
        }

        Ok(components)
    }

    fn emit_reminder(&self, item: &CalendarItem, base: &mut Component) {
        if item.properties.bool(tags::REMINDER_SET) != Some(true) {
            return;
        }

        let minutes = item
            .properties
            .i32(tags::REMINDER_DELTA)
            .and_then(|m| u32::try_from(m).ok())
            .unwrap_or(self.settings.default_reminder_minutes);
        let reminder = Reminder {
            is_set: true,
            minutes_before: if minutes == alarm::DEFAULT_REMINDER_SENTINEL {
                self.settings.default_reminder_minutes
            } else {
                minutes
            },
            reminder_time: item.properties.systime(tags::REMINDER_TIME),
            snooze_time: item.properties.systime(tags::REMINDER_SNOOZE_TIME),
            acknowledged: item.properties.systime(tags::REMINDER_ACK_TIME),
        };

        base.add_child(alarm::reminder_to_alarm(&reminder, item.kind));
        let recurring = item.properties.bool(tags::APPT_RECURRING) == Some(true)
            || item.properties.bool(tags::TASK_IS_RECURRING) == Some(true);
        for prop in alarm::extension_properties(&reminder, recurring) {
            base.add_property(prop);
        }
    }
}

/// The wire UID for an identifier: the original third-party string when
/// the identifier wraps one, hex otherwise.
pub(crate) fn wire_uid(goid: &GlobalId) -> String {
    match &goid.data {
        crate::globalid::GlobalIdData::ThirdParty(uid) => uid.clone(),
        crate::globalid::GlobalIdData::Native(_) => goid.to_uid(),
    }
}

fn recipient_query(prop: &Property, role_hint: RecipientRole) -> RecipientQuery {
    let email = prop
        .as_text()
        .unwrap_or_default()
        .strip_prefix("mailto:")
        .or_else(|| prop.as_text())
        .unwrap_or_default()
        .to_string();
    RecipientQuery {
        role_hint,
        email,
        display_name: prop
            .get_param_value("CN")
            .unwrap_or_default()
            .to_string(),
    }
}

/// Emits ORGANIZER/ATTENDEE lines for the item's recipient table.
fn emit_recipients(item: &CalendarItem, base: &mut Component) {
    for recipient in &item.recipients {
        let name = match recipient.role {
            RecipientRole::Organizer => "ORGANIZER",
            _ => "ATTENDEE",
        };
        let mut prop = Property::uri(name, format!("mailto:{}", recipient.email));
        if !recipient.display_name.is_empty() {
            prop.add_param(Parameter::new("CN", &recipient.display_name));
        }
        match recipient.role {
            RecipientRole::Organizer => {}
            RecipientRole::To => prop.add_param(Parameter::new("ROLE", "REQ-PARTICIPANT")),
            RecipientRole::Cc => prop.add_param(Parameter::new("ROLE", "OPT-PARTICIPANT")),
            RecipientRole::Bcc => prop.add_param(Parameter::new("ROLE", "NON-PARTICIPANT")),
        }
        if let Some(partstat) = recipient.track_status.partstat() {
            prop.add_param(Parameter::new("PARTSTAT", partstat));
        }
        base.add_property(prop);
    }
}

