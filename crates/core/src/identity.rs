//! Verified caller identity handed over by the upstream identity layer.

use serde::{Deserialize, Serialize};

use crate::error::{BankError, BankResult};
use crate::id::Uid;

/// An already-verified `(uid, display_name?, email?)` tuple.
///
/// The core trusts this unconditionally; verification happens upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: Uid,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

impl Identity {
    pub fn new(uid: Uid) -> Self {
        Self {
            uid,
            display_name: None,
            email: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Reject calls that arrive without a verified identity.
    pub fn require(caller: Option<&Identity>) -> BankResult<&Identity> {
        caller.ok_or(BankError::Unauthenticated)
    }
}
