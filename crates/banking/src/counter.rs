//! Named monotonic sequences backing account and card numbers.

use bankcore_core::{BankError, BankResult};
use bankcore_store::{DocumentStore, DocumentStoreExt, RetryPolicy, Tx, run_atomic};

use crate::records::Counter;

pub const ACCOUNT_NUMBER_SEQUENCE: &str = "account-number";
pub const CARD_NUMBER_SEQUENCE: &str = "card-number";

fn validate_sequence(sequence: &str) -> BankResult<()> {
    if sequence.trim().is_empty() {
        return Err(BankError::invalid_argument("sequence name is required"));
    }
    Ok(())
}

/// Hands out gap-free, strictly increasing values per sequence. The first value of a
/// fresh sequence is 1.
#[derive(Debug, Clone)]
pub struct CounterAllocator<S> {
    store: S,
    retry: RetryPolicy,
}

impl<S: DocumentStore> CounterAllocator<S> {
    pub fn new(store: S, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Allocate the next value in its own unit of work.
    pub fn allocate_next(&self, sequence: &str) -> BankResult<u64> {
        validate_sequence(sequence)?;
        let value = run_atomic(&self.store, self.retry, |tx| allocate_in(tx, sequence))?;
        tracing::debug!(sequence, value, "allocated sequence value");
        Ok(value)
    }

    /// Last allocated value, 0 for a sequence never used.
    pub fn current(&self, sequence: &str) -> BankResult<u64> {
        validate_sequence(sequence)?;
        Ok(self
            .store
            .fetch::<Counter>(&sequence.to_string())?
            .map(|counter| counter.current_value)
            .unwrap_or(0))
    }
}

/// Allocate the next value inside an already open unit of work, so the allocation
/// commits or aborts together with the caller's other writes.
pub fn allocate_in(tx: &mut Tx<'_>, sequence: &str) -> BankResult<u64> {
    validate_sequence(sequence)?;

    let current = tx
        .get::<Counter>(&sequence.to_string())?
        .map(|counter| counter.current_value)
        .unwrap_or(0);
    let next = current.checked_add(1).ok_or_else(|| {
        tracing::error!(sequence, "sequence overflow");
        BankError::Internal
    })?;

    tx.put(&Counter {
        name: sequence.to_string(),
        current_value: next,
    })?;
    Ok(next)
}
