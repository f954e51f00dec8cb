//! Retrying unit of work over any [`DocumentStore`].
//!
//! ```text
//! run_atomic(store, policy, work)
//!   ↓
//! 1. begin transaction
//!   ↓
//! 2. work(&mut Tx)   -- typed reads/writes, business checks
//!   ↓                   Err => abort, nothing applied
//! 3. commit           -- Conflict => back to 1 (bounded by RetryPolicy)
//! ```
//!
//! The closure may run several times, so it must not have side effects outside the
//! transaction handle it receives.

use bankcore_core::Entity;

use crate::document::{Document, decode};
use crate::document_store::{DocumentStore, Query, StoreError, Transaction};

/// Attempt budget for a unit of work under contention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 25;

    /// At least one attempt is always made.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS)
    }
}

/// Typed handle over an open [`Transaction`].
pub struct Tx<'s> {
    inner: Box<dyn Transaction + 's>,
    conflicted: bool,
}

impl<'s> Tx<'s> {
    fn new(inner: Box<dyn Transaction + 's>) -> Self {
        Self {
            inner,
            conflicted: false,
        }
    }

    fn track<T>(&mut self, result: Result<T, StoreError>) -> Result<T, StoreError> {
        if let Err(err) = &result {
            if err.is_conflict() {
                self.conflicted = true;
            }
        }
        result
    }

    pub fn get<D: Document>(&mut self, id: &D::Id) -> Result<Option<D>, StoreError> {
        let raw = self.inner.get(D::COLLECTION, &id.to_string());
        self.track(raw)?.map(|raw| decode(&raw)).transpose()
    }

    pub fn find<D: Document>(&mut self, query: &Query) -> Result<Vec<D>, StoreError> {
        let raw = self.inner.query(query);
        self.track(raw)?.iter().map(decode).collect()
    }

    pub fn find_one<D: Document>(&mut self, query: Query) -> Result<Option<D>, StoreError> {
        Ok(self.find(&query.limit(1))?.into_iter().next())
    }

    /// Keys of matching documents, without decoding their bodies.
    pub fn find_keys(&mut self, query: &Query) -> Result<Vec<String>, StoreError> {
        let raw = self.inner.query(query);
        Ok(self.track(raw)?.into_iter().map(|doc| doc.key).collect())
    }

    pub fn delete_key(&mut self, collection: &str, key: &str) -> Result<(), StoreError> {
        let staged = self.inner.delete(collection, key);
        self.track(staged)
    }

    pub fn put<D: Document>(&mut self, doc: &D) -> Result<(), StoreError> {
        let body = serde_json::to_value(doc)?;
        let staged = self.inner.put(D::COLLECTION, &doc.key(), body);
        self.track(staged)
    }

    pub fn delete<D: Document>(&mut self, id: &<D as Entity>::Id) -> Result<(), StoreError> {
        let staged = self.inner.delete(D::COLLECTION, &id.to_string());
        self.track(staged)
    }

    fn commit(self) -> Result<(), StoreError> {
        self.inner.commit()
    }
}

/// Run `work` as one atomic unit, retrying the whole unit on serialization conflicts.
///
/// - `Ok` from `work` commits; a conflicting commit re-runs `work` on fresh state.
/// - `Err` from `work` aborts with no effects, unless the transaction had already
///   observed a conflict, in which case the unit is retried.
/// - Running out of attempts yields [`StoreError::RetriesExhausted`].
pub fn run_atomic<S, T, E, F>(store: &S, policy: RetryPolicy, mut work: F) -> Result<T, E>
where
    S: DocumentStore + ?Sized,
    E: From<StoreError>,
    F: FnMut(&mut Tx<'_>) -> Result<T, E>,
{
    for attempt in 1..=policy.max_attempts() {
        let mut tx = Tx::new(store.begin()?);
        let outcome = work(&mut tx);

        match outcome {
            Ok(value) => match tx.commit() {
                Ok(()) => return Ok(value),
                Err(err) if err.is_conflict() => {
                    tracing::debug!(attempt, error = %err, "commit conflict; retrying unit of work");
                }
                Err(err) => return Err(err.into()),
            },
            Err(_) if tx.conflicted => {
                tracing::debug!(attempt, "read conflict; retrying unit of work");
            }
            Err(err) => return Err(err),
        }
    }

    Err(StoreError::RetriesExhausted {
        attempts: policy.max_attempts(),
    }
    .into())
}
