use serde_json::Value as JsonValue;
use thiserror::Error;

use bankcore_core::BankError;
use std::sync::Arc;

use super::query::Query;

/// A stored document: its collection, its key, and its JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    pub collection: String,
    pub key: String,
    pub body: JsonValue,
}

/// Document store operation error.
///
/// These are **infrastructure errors** (storage, isolation, encoding) as opposed to
/// bank errors (validation, ownership, funds). They cross into the bank taxonomy
/// only as [`BankError::Internal`].
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Serializable isolation could not be preserved; the unit of work may be retried.
    #[error("transaction conflict: {0}")]
    Conflict(String),

    /// A document body could not be encoded or decoded.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The backend is unreachable or in a broken state (e.g. poisoned lock).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A unit of work kept conflicting until its retry budget ran out.
    #[error("transaction retries exhausted after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        StoreError::Serialization(value.to_string())
    }
}

impl From<StoreError> for BankError {
    fn from(value: StoreError) -> Self {
        if value.is_conflict() {
            tracing::debug!(error = %value, "store conflict surfaced to caller");
        } else {
            tracing::error!(error = %value, "store operation failed");
        }
        BankError::Internal
    }
}

/// Document database boundary.
///
/// Implementations must provide:
/// - point lookup by `(collection, key)`
/// - equality/range queries with ordering, offset and limit ([`Query`])
/// - atomic multi-document read-modify-write transactions with serializable
///   isolation; a conflicting commit fails with [`StoreError::Conflict`] and leaves
///   no trace
///
/// Reads made directly on the store (outside a transaction) see committed data only
/// and are not isolated from concurrent commits.
pub trait DocumentStore: Send + Sync {
    /// Fetch one committed document.
    fn get(&self, collection: &str, key: &str) -> Result<Option<RawDocument>, StoreError>;

    /// Run a query against committed documents.
    fn query(&self, query: &Query) -> Result<Vec<RawDocument>, StoreError>;

    /// Open a transaction. Dropping it without `commit` discards every staged write.
    fn begin(&self) -> Result<Box<dyn Transaction + '_>, StoreError>;
}

/// One open unit of work against a [`DocumentStore`].
///
/// Reads observe the transaction's own staged writes. Writes stay invisible to
/// everyone else until `commit` succeeds; a failed commit applies nothing.
pub trait Transaction {
    fn get(&mut self, collection: &str, key: &str) -> Result<Option<RawDocument>, StoreError>;

    fn query(&mut self, query: &Query) -> Result<Vec<RawDocument>, StoreError>;

    /// Stage an insert-or-replace.
    fn put(&mut self, collection: &str, key: &str, body: JsonValue) -> Result<(), StoreError>;

    /// Stage a delete. Deleting a missing document is not an error.
    fn delete(&mut self, collection: &str, key: &str) -> Result<(), StoreError>;

    /// Validate and apply all staged writes atomically.
    fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    fn get(&self, collection: &str, key: &str) -> Result<Option<RawDocument>, StoreError> {
        (**self).get(collection, key)
    }

    fn query(&self, query: &Query) -> Result<Vec<RawDocument>, StoreError> {
        (**self).query(query)
    }

    fn begin(&self) -> Result<Box<dyn Transaction + '_>, StoreError> {
        (**self).begin()
    }
}
