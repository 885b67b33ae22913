//! Free/busy publication: a flat value ⇄ component mapping.
//!
//! Deliberately not part of the event/task converter dispatch; a
//! VFREEBUSY is a list of typed time slots and two addresses, nothing
//! more.

use chrono::{DateTime, Utc};
use dovetail_core::{ConvertError, ConvertResult};
use dovetail_rfc::ical::core::{
    Component, ComponentKind, DateTime as IcalDateTime, Parameter, Period, Property, Value,
};

/// Free/busy slot classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeBusyStatus {
    Free,
    Tentative,
    Busy,
    OutOfOffice,
}

impl FreeBusyStatus {
    /// The FBTYPE parameter token.
    #[must_use]
    pub const fn fbtype(self) -> &'static str {
        match self {
            Self::Free => "FREE",
            Self::Tentative => "BUSY-TENTATIVE",
            Self::Busy => "BUSY",
            Self::OutOfOffice => "BUSY-UNAVAILABLE",
        }
    }

    /// Parses an FBTYPE token; absent defaults to busy per RFC 5545.
    #[must_use]
    pub fn from_fbtype(token: Option<&str>) -> Self {
        match token.map(str::to_ascii_uppercase).as_deref() {
            Some("FREE") => Self::Free,
            Some("BUSY-TENTATIVE") => Self::Tentative,
            Some("BUSY-UNAVAILABLE") => Self::OutOfOffice,
            _ => Self::Busy,
        }
    }
}

/// One published slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeBusySlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: FreeBusyStatus,
}

/// Builds a VFREEBUSY component for a slot list.
#[must_use]
pub fn publish(
    organizer_email: &str,
    attendee_email: &str,
    window: (DateTime<Utc>, DateTime<Utc>),
    slots: &[FreeBusySlot],
) -> Component {
    let mut component = Component::freebusy();
    component.add_property(Property::uri(
        "ORGANIZER",
        format!("mailto:{organizer_email}"),
    ));
    component.add_property(Property::uri(
        "ATTENDEE",
        format!("mailto:{attendee_email}"),
    ));
    component.add_property(Property::datetime(
        "DTSTART",
        IcalDateTime::from_utc(window.0),
    ));
    component.add_property(Property::datetime("DTEND", IcalDateTime::from_utc(window.1)));

    for slot in slots {
        let period = Period::Explicit {
            start: IcalDateTime::from_utc(slot.start),
            end: IcalDateTime::from_utc(slot.end),
        };
        let raw = period.to_string();
        let mut prop = Property {
            name: "FREEBUSY".to_string(),
            params: vec![Parameter::new("FBTYPE", slot.status.fbtype())],
            value: Value::Period(period),
            raw_value: raw,
        };
        // Free slots are conventionally published too; the FBTYPE
        // parameter alone distinguishes them.
        if slot.status == FreeBusyStatus::Busy {
            prop.params.clear();
        }
        component.add_property(prop);
    }

    component
}

/// Reads the slot list back out of a VFREEBUSY component.
///
/// ## Errors
/// `InvalidObject` for a non-VFREEBUSY component; slots with unusable
/// periods are skipped.
pub fn parse_slots(component: &Component) -> ConvertResult<Vec<FreeBusySlot>> {
    if component.kind != Some(ComponentKind::FreeBusy) {
        return Err(ConvertError::InvalidObject(format!(
            "expected VFREEBUSY, got {}",
            component.name
        )));
    }

    let mut slots = Vec::new();
    for prop in component.get_properties("FREEBUSY") {
        let status = FreeBusyStatus::from_fbtype(prop.get_param_value("FBTYPE"));
        let periods: Vec<&Period> = match &prop.value {
            Value::Period(p) => vec![p],
            Value::PeriodList(list) => list.iter().collect(),
            _ => Vec::new(),
        };
        for period in periods {
            if let Some(slot) = slot_from_period(period, status) {
                slots.push(slot);
            }
        }
    }

    Ok(slots)
}

fn slot_from_period(period: &Period, status: FreeBusyStatus) -> Option<FreeBusySlot> {
    let to_utc = |dt: &IcalDateTime| {
        dt.to_naive()
            .map(|n| DateTime::from_naive_utc_and_offset(n, Utc))
    };

    match period {
        Period::Explicit { start, end } => Some(FreeBusySlot {
            start: to_utc(start)?,
            end: to_utc(end)?,
            status,
        }),
        Period::Duration { start, duration } => {
            let start = to_utc(start)?;
            Some(FreeBusySlot {
                start,
                end: start + chrono::Duration::seconds(duration.total_seconds()),
                status,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, 0, 0).unwrap()
    }

    #[test]
    fn publish_and_reparse() {
        let slots = vec![
            FreeBusySlot {
                start: at(9),
                end: at(10),
                status: FreeBusyStatus::Busy,
            },
            FreeBusySlot {
                start: at(14),
                end: at(15),
                status: FreeBusyStatus::Tentative,
            },
        ];
        let component = publish("a@example.com", "b@example.com", (at(0), at(23)), &slots);

        let parsed = parse_slots(&component).unwrap();
        assert_eq!(parsed, slots);
    }

    #[test]
    fn fbtype_defaults_to_busy() {
        assert_eq!(FreeBusyStatus::from_fbtype(None), FreeBusyStatus::Busy);
        assert_eq!(
            FreeBusyStatus::from_fbtype(Some("busy-unavailable")),
            FreeBusyStatus::OutOfOffice
        );
    }

    #[test]
    fn non_freebusy_component_rejected() {
        let component = Component::event();
        assert!(matches!(
            parse_slots(&component),
            Err(ConvertError::InvalidObject(_))
        ));
    }

    #[test]
    fn duration_period_becomes_slot() {
        let mut component = Component::freebusy();
        let period = dovetail_rfc::ical::parse::parse_period(
            "20260302T090000Z/PT2H",
            None,
            0,
            0,
        )
        .unwrap();
        let raw = period.to_string();
        component.add_property(Property {
            name: "FREEBUSY".to_string(),
            params: Vec::new(),
            value: Value::Period(period),
            raw_value: raw,
        });

        let slots = parse_slots(&component).unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].end, at(11));
    }
}
