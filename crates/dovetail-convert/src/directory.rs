//! Directory/address-book collaborator seam.
//!
//! The converter only needs two operations from the surrounding system;
//! failures degrade to unresolved one-off recipients rather than failing
//! the conversion.

use dovetail_core::ConvertResult;

use crate::item::{Recipient, RecipientRole};

/// A name waiting to be resolved against the address book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientQuery {
    pub role_hint: RecipientRole,
    pub email: String,
    pub display_name: String,
}

/// Address-book collaborator.
pub trait Directory {
    /// Resolves queries to full recipient entries (with store entry ids).
    ///
    /// ## Errors
    /// May fail wholesale (directory unreachable); the converter then
    /// degrades every query to a one-off recipient.
    fn resolve_recipients(&self, queries: &[RecipientQuery]) -> ConvertResult<Vec<Recipient>>;

    /// Whether the given address belongs to the session user.
    fn is_logged_in_user(&self, email: &str) -> bool;
}

/// Directory that resolves nothing; every recipient becomes a one-off.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDirectory;

impl Directory for NullDirectory {
    fn resolve_recipients(&self, queries: &[RecipientQuery]) -> ConvertResult<Vec<Recipient>> {
        Ok(queries
            .iter()
            .map(|q| Recipient::one_off(q.role_hint, &q.email, &q.display_name))
            .collect())
    }

    fn is_logged_in_user(&self, _email: &str) -> bool {
        false
    }
}
