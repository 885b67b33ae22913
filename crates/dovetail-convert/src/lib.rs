//! Conversion engine between iCalendar/vCard wire text and the groupware
//! store's property-bag model.
//!
//! The core is the bidirectional calendar path: parse wire text into the
//! component tree (via `dovetail-rfc`), then translate VEVENT/VTODO
//! components into [`item::CalendarItem`]s — resolving timezones,
//! translating RRULEs into the store-native recurrence descriptor,
//! computing per-occurrence exceptions, and encoding the binary global
//! identifier that ties a recurring series together. The reverse path
//! starts from property bags and emits a component tree.
//!
//! Everything here is synchronous and reentrant; the only state shared
//! between items of one session is the timezone cache inside
//! [`converter::Converter`].

pub mod alarm;
pub mod contact;
pub mod converter;
pub mod directory;
pub mod globalid;
pub mod item;
pub mod recurrence;
pub mod timezone;

pub use converter::Converter;
pub use directory::{Directory, NullDirectory};
pub use item::{CalendarItem, Exception, ItemKind, Recipient};
pub use recurrence::RecurrenceDescriptor;
pub use timezone::TimezoneRule;
