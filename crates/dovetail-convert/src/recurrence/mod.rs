//! The recurrence engine: store-native descriptor, RRULE translation in
//! both directions, occurrence enumeration, and the persisted binary
//! recurrence-state blobs.
//!
//! The "state machine" here is a rule interpreter with two directions:
//! [`rrule_to_descriptor`] narrows wire rules into the store pattern
//! space (reproducing the documented client-compatibility quirks), and
//! [`descriptor_to_rrule`] is its exact inverse. Both lean on
//! [`OccurrenceIter`] for count⇄end-date interconversion, end-date
//! snapping, and exception placement validation.

mod blob;
mod descriptor;
mod emit;
mod iter;
mod parse;

pub use blob::{decode_state, encode_state};
pub use descriptor::{
    ModifiedOccurrence, PatternFrequency, RecurrenceDescriptor, RecurrenceEnd, WeekNumber,
    never_end_date, overrides, weekday_bit,
};
pub use emit::{deleted_occurrence_utcs, descriptor_to_rrule};
pub use iter::{Occurrence, OccurrenceIter};
pub(crate) use iter::occurs_on_day;
pub use parse::rrule_to_descriptor;
pub(crate) use parse::local_datetime;
