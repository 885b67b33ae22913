//! iCalendar core models (RFC 5545).
//!
//! The tree these types form is the hand-off point between the text layer
//! and the conversion engine: parsers build it, converters walk it, the
//! serializer writes it out. Design goals:
//! - Round-trip fidelity: unknown properties and parameters survive
//! - Insertion order preserved for properties and children
//! - Typed values where the converters need them, raw text everywhere else

mod component;
mod datetime;
mod duration;
mod parameter;
mod property;
mod rrule;
mod value;

pub use component::{Component, ComponentKind, ICalendar};
pub use datetime::{Date, DateTime, DateTimeForm, Time, UtcOffset};
pub use duration::Duration;
pub use parameter::Parameter;
pub use property::{ContentLine, Property, names};
pub use rrule::{Frequency, RRule, RRuleUntil, Weekday, WeekdayNum};
pub use value::{Period, Value};
