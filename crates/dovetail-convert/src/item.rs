//! Store-side item model produced and consumed by the converters.
//!
//! A [`CalendarItem`] and everything hanging off it (properties,
//! recipients, exceptions) form one owned tree per conversion call; the
//! caller receives it whole and persists it. Exceptions are value types,
//! never back-references into the base item.

use chrono::{DateTime, Utc};
use dovetail_core::{PropertyBag, WriteMode};

use crate::recurrence::RecurrenceDescriptor;
use crate::timezone::TimezoneRule;

/// Which converter family handles an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Event,
    Task,
}

impl ItemKind {
    /// Store message class for this kind.
    #[must_use]
    pub const fn message_class(self) -> &'static str {
        match self {
            Self::Event => "IPM.Appointment",
            Self::Task => "IPM.Task",
        }
    }
}

/// Recipient role within an item's recipient table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecipientRole {
    Organizer,
    To,
    Cc,
    Bcc,
}

/// Meeting response tracking status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TrackStatus {
    #[default]
    None,
    Organized,
    Tentative,
    Accepted,
    Declined,
    NotResponded,
}

impl TrackStatus {
    /// Maps to the stored status code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Organized => 1,
            Self::Tentative => 2,
            Self::Accepted => 3,
            Self::Declined => 4,
            Self::NotResponded => 5,
        }
    }

    /// Inverse of [`TrackStatus::code`]; unknown codes map to `None`.
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Organized,
            2 => Self::Tentative,
            3 => Self::Accepted,
            4 => Self::Declined,
            5 => Self::NotResponded,
            _ => Self::None,
        }
    }

    /// The iCalendar PARTSTAT token for this status, if any.
    #[must_use]
    pub const fn partstat(self) -> Option<&'static str> {
        match self {
            Self::Tentative => Some("TENTATIVE"),
            Self::Accepted => Some("ACCEPTED"),
            Self::Declined => Some("DECLINED"),
            Self::NotResponded => Some("NEEDS-ACTION"),
            Self::None | Self::Organized => None,
        }
    }

    /// Parses an iCalendar PARTSTAT token.
    #[must_use]
    pub fn from_partstat(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "TENTATIVE" => Self::Tentative,
            "ACCEPTED" => Self::Accepted,
            "DECLINED" => Self::Declined,
            "NEEDS-ACTION" => Self::NotResponded,
            _ => Self::None,
        }
    }
}

/// One entry of an item's recipient table.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipient {
    pub role: RecipientRole,
    pub email: String,
    pub display_name: String,
    pub track_status: TrackStatus,
    /// Store address-book entry identifier; empty for one-off recipients
    /// that the directory could not resolve.
    pub entry_id: Vec<u8>,
}

impl Recipient {
    /// Builds an unresolved one-off recipient.
    #[must_use]
    pub fn one_off(role: RecipientRole, email: &str, display_name: &str) -> Self {
        Self {
            role,
            email: email.to_string(),
            display_name: if display_name.is_empty() {
                email.to_string()
            } else {
                display_name.to_string()
            },
            track_status: TrackStatus::None,
            entry_id: Vec::new(),
        }
    }
}

/// One modified or cancelled occurrence of a series, as a standalone
/// sub-message payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exception {
    /// UTC midnight of the original occurrence this exception replaces.
    pub base_date: Option<DateTime<Utc>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Attachment-level properties of the exception sub-message.
    pub attachment_properties: PropertyBag,
    /// Message-level properties of the exception sub-message.
    pub message_properties: PropertyBag,
    pub recipients: Vec<Recipient>,
}

/// One converted calendar item: a property bag plus the structured state
/// the bag alone cannot carry.
#[derive(Debug, Clone)]
pub struct CalendarItem {
    pub kind: ItemKind,
    pub last_modified: Option<DateTime<Utc>>,
    /// Binary series identity (the "clean" global identifier).
    pub series_guid: Vec<u8>,
    pub timezone: TimezoneRule,
    /// Display name of the resolved timezone, possibly a "(GMT±HHMM)"
    /// fallback.
    pub timezone_name: String,
    pub recurrence: Option<RecurrenceDescriptor>,
    pub properties: PropertyBag,
    pub recipients: Vec<Recipient>,
    /// Tags to remove from a pre-existing stored item on write-back.
    pub delete_tags: Vec<u32>,
    /// Whether the caller should merge into or replace the stored item.
    pub write_mode: WriteMode,
    pub exceptions: Vec<Exception>,
}

impl CalendarItem {
    #[must_use]
    pub fn new(kind: ItemKind) -> Self {
        Self {
            kind,
            last_modified: None,
            series_guid: Vec::new(),
            timezone: TimezoneRule::utc(),
            timezone_name: "Etc/UTC".to_string(),
            recurrence: None,
            properties: PropertyBag::new(),
            recipients: Vec::new(),
            delete_tags: Vec::new(),
            write_mode: WriteMode::default(),
            exceptions: Vec::new(),
        }
    }

    /// Returns the organizer recipient, if any.
    #[must_use]
    pub fn organizer(&self) -> Option<&Recipient> {
        self.recipients
            .iter()
            .find(|r| r.role == RecipientRole::Organizer)
    }
}

/// A per-item failure recorded while converting a batch.
#[derive(Debug)]
pub struct ItemError {
    /// Index of the component within the wire payload.
    pub index: usize,
    pub uid: Option<String>,
    pub error: dovetail_core::ConvertError,
}

/// The outcome of converting one wire payload: converted items plus the
/// per-item failures that were skipped (spec: a bad component never
/// aborts the batch).
#[derive(Debug, Default)]
pub struct ConversionBatch {
    pub items: Vec<CalendarItem>,
    pub errors: Vec<ItemError>,
}
