//! Wire-text layer: iCalendar (RFC 5545) and vCard (RFC 2426).
//!
//! Parses wire text into a typed component tree and serializes the tree
//! back. This crate knows nothing about the property-bag store model;
//! the conversion engine sits on top of it.

pub mod error;
pub mod ical;
pub mod vcard;

pub use error::{RfcError, RfcResult};
