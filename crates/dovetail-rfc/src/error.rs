//! Umbrella error for the wire-text layer.

use thiserror::Error;

/// RFC parsing and serialization errors.
#[derive(Error, Debug)]
pub enum RfcError {
    #[error(transparent)]
    Ical(#[from] crate::ical::parse::ParseError),

    #[error(transparent)]
    Vcard(#[from] crate::vcard::VcardParseError),

    #[error(transparent)]
    Convert(#[from] dovetail_core::ConvertError),
}

impl From<RfcError> for dovetail_core::ConvertError {
    fn from(err: RfcError) -> Self {
        match err {
            RfcError::Convert(e) => e,
            other => Self::CorruptData(other.to_string()),
        }
    }
}

pub type RfcResult<T> = std::result::Result<T, RfcError>;
