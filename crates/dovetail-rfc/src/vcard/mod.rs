//! vCard layer (RFC 2426): thin peer of the iCalendar layer.
//!
//! Shares the content-line lexer with iCalendar; vCard adds property
//! groups (`item1.TEL`) and the structured N/ADR values.

mod card;
mod parse;
mod build;

pub use build::serialize;
pub use card::{Address, StructuredName, Vcard, VcardProperty};
pub use parse::{VcardParseError, parse};
