//! Error taxonomy shared by every bank operation.

use thiserror::Error;

/// Result type used across the bank core.
pub type BankResult<T> = Result<T, BankError>;

/// Bank-level error.
///
/// Every operation fails with exactly one of these. Infrastructure failures are
/// collapsed into [`BankError::Internal`] and never carry storage detail.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BankError {
    /// No verified identity was supplied.
    #[error("unauthenticated")]
    Unauthenticated,

    /// Missing, malformed or oversized input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Account, card or counter absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller does not own the addressed resource.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The operation is valid but the current state forbids it (e.g. insufficient funds).
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    /// Storage or transaction failure.
    #[error("internal error")]
    Internal,
}

impl BankError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    pub fn failed_precondition(msg: impl Into<String>) -> Self {
        Self::FailedPrecondition(msg.into())
    }

    /// Stable machine-readable code for the variant.
    pub fn code(&self) -> &'static str {
        match self {
            BankError::Unauthenticated => "unauthenticated",
            BankError::InvalidArgument(_) => "invalid_argument",
            BankError::NotFound(_) => "not_found",
            BankError::PermissionDenied(_) => "permission_denied",
            BankError::FailedPrecondition(_) => "failed_precondition",
            BankError::Internal => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_error_hides_detail() {
        assert_eq!(BankError::Internal.to_string(), "internal error");
        assert_eq!(BankError::Internal.code(), "internal");
    }

    #[test]
    fn codes_are_distinct() {
        let errors = [
            BankError::Unauthenticated,
            BankError::invalid_argument("x"),
            BankError::not_found("x"),
            BankError::permission_denied("x"),
            BankError::failed_precondition("x"),
            BankError::Internal,
        ];
        let mut codes: Vec<_> = errors.iter().map(BankError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}
