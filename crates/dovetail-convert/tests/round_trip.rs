//! End-to-end conversion tests: wire text → store items → wire text.

use test_log::test;

use dovetail_convert::converter::Converter;
use dovetail_convert::directory::NullDirectory;
use dovetail_convert::item::ItemKind;
use dovetail_convert::recurrence::{RecurrenceEnd, decode_state};
use dovetail_core::{ConvertError, ConverterSettings, tags};
use dovetail_rfc::ical::parse::parse;

const RECURRING_BERLIN: &str = "\
BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//Test//Test//EN\r\n\
BEGIN:VTIMEZONE\r\n\
TZID:Europe/Berlin\r\n\
BEGIN:STANDARD\r\n\
DTSTART:19701025T030000\r\n\
RRULE:FREQ=YEARLY;BYMONTH=10;BYDAY=-1SU\r\n\
TZOFFSETFROM:+0200\r\n\
TZOFFSETTO:+0100\r\n\
END:STANDARD\r\n\
BEGIN:DAYLIGHT\r\n\
DTSTART:19700329T020000\r\n\
RRULE:FREQ=YEARLY;BYMONTH=3;BYDAY=-1SU\r\n\
TZOFFSETFROM:+0100\r\n\
TZOFFSETTO:+0200\r\n\
END:DAYLIGHT\r\n\
END:VTIMEZONE\r\n\
BEGIN:VEVENT\r\n\
UID:series-1@example.com\r\n\
DTSTAMP:20260220T120000Z\r\n\
LAST-MODIFIED:20260221T080000Z\r\n\
DTSTART;TZID=Europe/Berlin:20260302T090000\r\n\
DTEND;TZID=Europe/Berlin:20260302T100000\r\n\
RRULE:FREQ=WEEKLY;BYDAY=MO,WE,FR;COUNT=5\r\n\
SUMMARY:Standup\r\n\
LOCATION:Room 4\r\n\
DESCRIPTION:Weekly sync\r\n\
CLASS:PRIVATE\r\n\
PRIORITY:1\r\n\
TRANSP:OPAQUE\r\n\
BEGIN:VALARM\r\n\
ACTION:DISPLAY\r\n\
TRIGGER:-PT15M\r\n\
DESCRIPTION:Reminder\r\n\
END:VALARM\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

fn convert(input: &str) -> dovetail_convert::item::ConversionBatch {
    let settings = ConverterSettings::default();
    let directory = NullDirectory;
    let mut converter = Converter::new(&settings, &directory);
    converter.ical_to_items(input).expect("payload converts")
}

#[test]
fn recurring_event_produces_full_property_bag() {
    let batch = convert(RECURRING_BERLIN);
    assert!(batch.errors.is_empty());
    assert_eq!(batch.items.len(), 1);

    let item = &batch.items[0];
    assert_eq!(item.kind, ItemKind::Event);
    assert_eq!(item.properties.string(tags::SUBJECT), Some("Standup"));
    assert_eq!(item.properties.string(tags::APPT_LOCATION), Some("Room 4"));
    assert_eq!(item.properties.i32(tags::SENSITIVITY), Some(2));
    assert_eq!(item.properties.i32(tags::IMPORTANCE), Some(2));
    assert_eq!(item.timezone_name, "Europe/Berlin");

    // 09:00 Berlin in March is 08:00 UTC
    let start = item.properties.systime(tags::APPT_START_WHOLE).unwrap();
    assert_eq!(start.to_rfc3339(), "2026-03-02T08:00:00+00:00");

    // Reminder extracted from the VALARM
    assert_eq!(item.properties.bool(tags::REMINDER_SET), Some(true));
    assert_eq!(item.properties.i32(tags::REMINDER_DELTA), Some(15));

    // Recurrence descriptor and blob agree
    let desc = item.recurrence.as_ref().unwrap();
    assert_eq!(desc.end, RecurrenceEnd::AfterCount(5));
    let blob = item.properties.binary(tags::APPT_RECURRENCE_STATE).unwrap();
    let decoded = decode_state(blob, ItemKind::Event).unwrap();
    assert_eq!(&decoded, desc);

    // Series identity present in both variants
    assert!(item.properties.binary(tags::GLOBAL_ID).is_some());
    assert_eq!(
        item.properties.binary(tags::CLEAN_GLOBAL_ID).unwrap(),
        item.series_guid.as_slice()
    );
}

#[test]
fn emitted_calendar_reparses_with_same_semantics() {
    let batch = convert(RECURRING_BERLIN);
    let settings = ConverterSettings::default();
    let directory = NullDirectory;
    let mut converter = Converter::new(&settings, &directory);

    let (text, errors) = converter.items_to_ical(&batch.items, None);
    assert!(errors.is_empty(), "emit errors: {errors:?}");

    let reparsed = parse(&text).expect("emitted text parses");
    assert_eq!(reparsed.events().len(), 1);
    assert_eq!(reparsed.timezones().len(), 1);

    let event = &reparsed.events()[0];
    assert_eq!(event.uid(), Some("series-1@example.com"));
    assert_eq!(event.summary(), Some("Standup"));

    let rrule = event
        .get_property("RRULE")
        .unwrap()
        .value
        .as_recur()
        .unwrap();
    assert_eq!(rrule.count, Some(5));
    assert_eq!(rrule.by_day.len(), 3);

    // And a second conversion of the emitted text matches the first
    let second = convert(&text);
    assert!(second.errors.is_empty());
    let first_desc = batch.items[0].recurrence.as_ref().unwrap();
    let second_desc = second.items[0].recurrence.as_ref().unwrap();
    assert_eq!(first_desc.count, second_desc.count);
    assert_eq!(first_desc.week_days, second_desc.week_days);
    assert_eq!(first_desc.end_date, second_desc.end_date);
}

const SERIES_WITH_EXCEPTION: &str = "\
BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//Test//Test//EN\r\n\
BEGIN:VEVENT\r\n\
UID:series-2@example.com\r\n\
DTSTAMP:20260220T120000Z\r\n\
DTSTART:20260302T090000Z\r\n\
DTEND:20260302T100000Z\r\n\
RRULE:FREQ=DAILY;COUNT=5\r\n\
SUMMARY:Daily check\r\n\
LOCATION:Desk\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:series-2@example.com\r\n\
RECURRENCE-ID:20260304T090000Z\r\n\
DTSTAMP:20260220T120000Z\r\n\
DTSTART:20260304T140000Z\r\n\
DTEND:20260304T150000Z\r\n\
SUMMARY:Moved check\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

#[test]
fn exception_component_modifies_base_series() {
    let batch = convert(SERIES_WITH_EXCEPTION);
    assert!(batch.errors.is_empty(), "errors: {:?}", batch.errors);
    assert_eq!(batch.items.len(), 1);

    let item = &batch.items[0];
    let desc = item.recurrence.as_ref().unwrap();
    assert_eq!(desc.modified_occurrences.len(), 1);

    let modified = &desc.modified_occurrences[0];
    assert_eq!(modified.base.to_string(), "2026-03-04 09:00:00");
    assert_eq!(modified.start.to_string(), "2026-03-04 14:00:00");
    assert_eq!(modified.subject.as_deref(), Some("Moved check"));

    assert_eq!(item.exceptions.len(), 1);
    let exception = &item.exceptions[0];
    assert_eq!(
        exception.base_date.unwrap().to_rfc3339(),
        "2026-03-04T00:00:00+00:00"
    );
    // Copy-forward keeps the base location; subject was overridden
    assert_eq!(
        exception.message_properties.string(tags::APPT_LOCATION),
        Some("Desk")
    );
    assert_eq!(
        exception.message_properties.string(tags::SUBJECT),
        Some("Moved check")
    );
}

#[test]
fn exception_emits_as_separate_component() {
    let batch = convert(SERIES_WITH_EXCEPTION);
    let settings = ConverterSettings::default();
    let directory = NullDirectory;
    let mut converter = Converter::new(&settings, &directory);

    let (text, errors) = converter.items_to_ical(&batch.items, None);
    assert!(errors.is_empty());

    let reparsed = parse(&text).unwrap();
    let events = reparsed.events();
    assert_eq!(events.len(), 2);

    let exception = events
        .iter()
        .find(|e| e.recurrence_id().is_some())
        .expect("exception component present");
    assert_eq!(exception.summary(), Some("Moved check"));
    // Exception-invalid fields stay stripped
    assert!(exception.get_property("RRULE").is_none());
    assert!(exception.get_property("EXDATE").is_none());
    assert!(exception.get_property("CLASS").is_none());
}

#[test]
fn exception_on_missing_occurrence_is_rejected() {
    // RECURRENCE-ID on a Sunday the daily COUNT=5 series never reaches
    let input = SERIES_WITH_EXCEPTION.replace(
        "RECURRENCE-ID:20260304T090000Z",
        "RECURRENCE-ID:20260315T090000Z",
    );
    let batch = convert(&input);
    assert_eq!(batch.items.len(), 1);
    assert_eq!(batch.errors.len(), 1);
    assert!(matches!(
        batch.errors[0].error,
        ConvertError::InvalidObject(_)
    ));
    // The base item stays unmodified
    assert!(batch.items[0]
        .recurrence
        .as_ref()
        .unwrap()
        .modified_occurrences
        .is_empty());
}

#[test]
fn damaged_component_is_skipped_not_fatal() {
    // Second component is recurring but has no end-time source at all
    let input = "\
BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//Test//Test//EN\r\n\
BEGIN:VEVENT\r\n\
UID:good@example.com\r\n\
DTSTAMP:20260220T120000Z\r\n\
DTSTART:20260302T090000Z\r\n\
DTEND:20260302T100000Z\r\n\
SUMMARY:Good\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:bad@example.com\r\n\
DTSTAMP:20260220T120000Z\r\n\
DTSTART:20260303T090000Z\r\n\
RRULE:FREQ=DAILY;COUNT=3\r\n\
SUMMARY:Bad\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    let batch = convert(input);
    assert_eq!(batch.items.len(), 1);
    assert_eq!(batch.items[0].properties.string(tags::SUBJECT), Some("Good"));
    assert_eq!(batch.errors.len(), 1);
    assert_eq!(batch.errors[0].uid.as_deref(), Some("bad@example.com"));
    assert!(matches!(batch.errors[0].error, ConvertError::NotFound(_)));
}

#[test]
fn task_converts_and_round_trips() {
    let input = "\
BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//Test//Test//EN\r\n\
BEGIN:VTODO\r\n\
UID:task-1@example.com\r\n\
DTSTAMP:20260220T120000Z\r\n\
DTSTART:20260302T000000Z\r\n\
DUE:20260306T000000Z\r\n\
SUMMARY:File the report\r\n\
STATUS:IN-PROCESS\r\n\
PERCENT-COMPLETE:40\r\n\
END:VTODO\r\n\
END:VCALENDAR\r\n";

    let batch = convert(input);
    assert!(batch.errors.is_empty());
    let item = &batch.items[0];
    assert_eq!(item.kind, ItemKind::Task);
    assert_eq!(item.properties.i32(tags::TASK_STATUS), Some(1));
    assert_eq!(item.properties.f64(tags::TASK_PERCENT_COMPLETE), Some(0.4));
    assert!(item.properties.systime(tags::TASK_DUE_DATE).is_some());

    let settings = ConverterSettings::default();
    let directory = NullDirectory;
    let mut converter = Converter::new(&settings, &directory);
    let (text, errors) = converter.items_to_ical(&batch.items, None);
    assert!(errors.is_empty());

    let reparsed = parse(&text).unwrap();
    let todo = &reparsed.todos()[0];
    assert_eq!(todo.summary(), Some("File the report"));
    assert_eq!(
        todo.get_property("STATUS").unwrap().as_text(),
        Some("IN-PROCESS")
    );
    assert_eq!(
        todo.get_property("PERCENT-COMPLETE").unwrap().as_integer(),
        Some(40)
    );
}

#[test]
fn all_day_event_round_trips_as_date() {
    let input = "\
BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//Test//Test//EN\r\n\
BEGIN:VEVENT\r\n\
UID:allday@example.com\r\n\
DTSTAMP:20260220T120000Z\r\n\
DTSTART;VALUE=DATE:20260302\r\n\
SUMMARY:Conference day\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    let batch = convert(input);
    assert!(batch.errors.is_empty());
    let item = &batch.items[0];
    assert_eq!(item.properties.bool(tags::APPT_ALL_DAY), Some(true));
    assert_eq!(item.properties.i32(tags::APPT_DURATION), Some(24 * 60));

    let settings = ConverterSettings::default();
    let directory = NullDirectory;
    let mut converter = Converter::new(&settings, &directory);
    let (text, _) = converter.items_to_ical(&batch.items, None);
    assert!(text.contains("DTSTART;VALUE=DATE:20260302"));
}

#[test]
fn attendees_become_recipients_with_track_status() {
    let input = "\
BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//Test//Test//EN\r\n\
METHOD:REQUEST\r\n\
BEGIN:VEVENT\r\n\
UID:meeting@example.com\r\n\
DTSTAMP:20260220T120000Z\r\n\
DTSTART:20260302T090000Z\r\n\
DTEND:20260302T100000Z\r\n\
SUMMARY:Planning\r\n\
ORGANIZER;CN=Boss:mailto:boss@example.com\r\n\
ATTENDEE;CN=Jane;ROLE=REQ-PARTICIPANT;PARTSTAT=ACCEPTED:mailto:jane@example.com\r\n\
ATTENDEE;ROLE=OPT-PARTICIPANT:mailto:opt@example.com\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    let batch = convert(input);
    assert!(batch.errors.is_empty());
    let item = &batch.items[0];

    assert_eq!(item.recipients.len(), 3);
    let organizer = item.organizer().unwrap();
    assert_eq!(organizer.email, "boss@example.com");

    let jane = item
        .recipients
        .iter()
        .find(|r| r.email == "jane@example.com")
        .unwrap();
    assert_eq!(
        jane.track_status,
        dovetail_convert::item::TrackStatus::Accepted
    );

    // METHOD:REQUEST marks the item as a received meeting request
    assert_eq!(item.properties.i32(tags::APPT_MEETING_STATUS), Some(3));
}

#[test]
fn third_party_uid_survives_full_cycle() {
    let batch = convert(SERIES_WITH_EXCEPTION);
    let settings = ConverterSettings::default();
    let directory = NullDirectory;
    let mut converter = Converter::new(&settings, &directory);
    let (text, _) = converter.items_to_ical(&batch.items, None);

    // The third-party UID string comes back verbatim, not hex-wrapped
    assert!(text.contains("UID:series-2@example.com"));
}
