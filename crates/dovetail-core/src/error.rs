//! Error taxonomy shared by all conversion layers.
//!
//! Callers branch on these variants: a missing mandatory property
//! (`NotFound`) is recoverable by treating the item as non-recurring or
//! skipping it, while `CorruptData` means the input itself is damaged and
//! retrying cannot help. The two must never be conflated.

use thiserror::Error;

/// Conversion error taxonomy.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Malformed call parameters.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Missing mandatory property, timezone, or recurrence blob.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Parser-level malformed text or binary blob.
    #[error("Corrupt data: {0}")]
    CorruptData(String),

    /// Structurally wrong component kind, or an exception that fails
    /// occurrence validation.
    #[error("Invalid object: {0}")]
    InvalidObject(String),

    /// A recognized but unrepresentable pattern.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Allocation failure surfaced by a collaborator.
    #[error("Out of memory")]
    OutOfMemory,
}

impl ConvertError {
    /// Returns whether this error leaves the item skippable within a batch.
    ///
    /// Per-item parse failures are recorded and the item is skipped; only
    /// argument errors indicate a caller bug that should surface.
    #[must_use]
    pub const fn is_item_local(&self) -> bool {
        !matches!(self, Self::InvalidArgument(_) | Self::OutOfMemory)
    }
}

pub type ConvertResult<T> = std::result::Result<T, ConvertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_distinguishable_from_corrupt() {
        let nf = ConvertError::NotFound("RRULE blob".into());
        let cd = ConvertError::CorruptData("truncated blob".into());
        assert!(matches!(nf, ConvertError::NotFound(_)));
        assert!(matches!(cd, ConvertError::CorruptData(_)));
    }

    #[test]
    fn item_local_classification() {
        assert!(ConvertError::CorruptData("x".into()).is_item_local());
        assert!(ConvertError::NotFound("x".into()).is_item_local());
        assert!(!ConvertError::InvalidArgument("x".into()).is_item_local());
    }
}
