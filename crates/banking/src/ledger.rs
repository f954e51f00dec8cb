//! Deposits and withdrawals with a ledger entry per movement.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bankcore_core::{BankError, BankResult, EntryId, Uid};
use bankcore_store::{DocumentStore, RetryPolicy, run_atomic};

use crate::account::by_number;
use crate::identifier::AccountNumber;
use crate::input::optional_text;
use crate::records::{self, Account, LedgerEntry, TransactionType};

pub const MAX_CATEGORY_CHARS: usize = 80;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub account_number: AccountNumber,
    pub amount_in_cents: u64,
    pub kind: TransactionType,
    pub uid: Uid,
    /// Defaults to the execution time.
    pub timestamp: Option<DateTime<Utc>>,
    pub category: Option<String>,
}

impl TransactionRequest {
    pub fn new(account_number: AccountNumber, amount_in_cents: u64, kind: TransactionType, uid: Uid) -> Self {
        Self {
            account_number,
            amount_in_cents,
            kind,
            uid,
            timestamp: None,
            category: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_id: EntryId,
    pub new_balance_in_cents: u64,
}

/// Balance after applying one movement.
pub fn apply_movement(balance: u64, amount: u64, kind: TransactionType) -> BankResult<u64> {
    match kind {
        TransactionType::Deposit => balance
            .checked_add(amount)
            .ok_or_else(|| BankError::failed_precondition("deposit would overflow the balance")),
        TransactionType::Withdrawal => balance
            .checked_sub(amount)
            .ok_or_else(|| BankError::failed_precondition("insufficient funds")),
    }
}

#[derive(Debug, Clone)]
pub struct LedgerTransactionExecutor<S> {
    store: S,
    retry: RetryPolicy,
}

impl<S: DocumentStore> LedgerTransactionExecutor<S> {
    pub fn new(store: S, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Apply a movement to the caller's account.
    ///
    /// The balance update and the ledger entry commit together or not at all.
    pub fn execute(&self, request: TransactionRequest) -> BankResult<TransactionReceipt> {
        if request.amount_in_cents == 0 {
            return Err(BankError::invalid_argument(
                "amount must be a positive number of cents",
            ));
        }
        let category = optional_text("category", request.category.as_deref(), MAX_CATEGORY_CHARS)?;
        let timestamp = request.timestamp.map(records::stored_precision);

        let receipt = run_atomic(&self.store, self.retry, |tx| {
            let account = tx
                .find_one::<Account>(by_number(&request.account_number))?
                .ok_or_else(|| {
                    BankError::not_found(format!("account {} not found", request.account_number))
                })?;

            if account.uid != request.uid {
                return Err(BankError::permission_denied(
                    "account does not belong to the authenticated user",
                ));
            }

            let new_balance = apply_movement(account.balance_in_cents, request.amount_in_cents, request.kind)?;
            let now = records::now();

            let entry = LedgerEntry {
                id: EntryId::new(),
                account_id: account.id,
                account_number: account.account_number.clone(),
                uid: account.uid.clone(),
                kind: request.kind,
                amount_in_cents: request.amount_in_cents,
                new_balance_in_cents: new_balance,
                timestamp: timestamp.unwrap_or(now),
                category: category.clone(),
            };
            tx.put(&Account {
                balance_in_cents: new_balance,
                updated_at: now,
                ..account
            })?;
            tx.put(&entry)?;

            Ok(TransactionReceipt {
                transaction_id: entry.id,
                new_balance_in_cents: new_balance,
            })
        })?;

        tracing::info!(
            account_number = %request.account_number,
            kind = %request.kind,
            amount_in_cents = request.amount_in_cents,
            new_balance_in_cents = receipt.new_balance_in_cents,
            transaction_id = %receipt.transaction_id,
            "ledger transaction committed"
        );

        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountProvisioner;
    use crate::test_support::{open_account, store, uid};
    use bankcore_store::{DocumentStoreExt, InMemoryDocumentStore, Query};
    use chrono::TimeZone;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn executor(store: &Arc<InMemoryDocumentStore>) -> LedgerTransactionExecutor<Arc<InMemoryDocumentStore>> {
        LedgerTransactionExecutor::new(store.clone(), RetryPolicy::default())
    }

    fn entries(store: &Arc<InMemoryDocumentStore>) -> Vec<LedgerEntry> {
        store.find::<LedgerEntry>(&Query::of::<LedgerEntry>()).unwrap()
    }

    #[test]
    fn deposit_then_withdraw() {
        let store = store();
        let account = open_account(&store, "ada");
        let ledger = executor(&store);

        let deposit = ledger
            .execute(TransactionRequest::new(
                account.account_number.clone(),
                1_000,
                TransactionType::Deposit,
                account.uid.clone(),
            ))
            .unwrap();
        assert_eq!(deposit.new_balance_in_cents, 1_000);

        let withdrawal = ledger
            .execute(
                TransactionRequest::new(
                    account.account_number.clone(),
                    300,
                    TransactionType::Withdrawal,
                    account.uid.clone(),
                )
                .with_category(" groceries "),
            )
            .unwrap();
        assert_eq!(withdrawal.new_balance_in_cents, 700);

        let stored = store.fetch::<LedgerEntry>(&withdrawal.transaction_id).unwrap().unwrap();
        assert_eq!(stored.kind, TransactionType::Withdrawal);
        assert_eq!(stored.amount_in_cents, 300);
        assert_eq!(stored.new_balance_in_cents, 700);
        assert_eq!(stored.category.as_deref(), Some("groceries"));

        let refreshed = store.fetch::<Account>(&account.id).unwrap().unwrap();
        assert_eq!(refreshed.balance_in_cents, 700);
        assert!(refreshed.updated_at >= account.updated_at);
    }

    #[test]
    fn overdraft_is_rejected_without_effects() {
        let store = store();
        let account = open_account(&store, "ada");

        let err = executor(&store)
            .execute(TransactionRequest::new(
                account.account_number.clone(),
                1,
                TransactionType::Withdrawal,
                account.uid.clone(),
            ))
            .unwrap_err();

        assert_eq!(err, BankError::failed_precondition("insufficient funds"));
        assert!(entries(&store).is_empty());
        assert_eq!(store.fetch::<Account>(&account.id).unwrap().unwrap().balance_in_cents, 0);
    }

    #[test]
    fn rejects_zero_amount_foreign_and_unknown_accounts() {
        let store = store();
        let ada = open_account(&store, "ada");
        let ledger = executor(&store);

        let zero = TransactionRequest::new(ada.account_number.clone(), 0, TransactionType::Deposit, ada.uid.clone());
        assert!(matches!(ledger.execute(zero), Err(BankError::InvalidArgument(_))));

        let foreign = TransactionRequest::new(ada.account_number.clone(), 10, TransactionType::Deposit, uid("mallory"));
        assert!(matches!(ledger.execute(foreign), Err(BankError::PermissionDenied(_))));

        let unknown = TransactionRequest::new(
            AccountNumber::from_serial(42).unwrap(),
            10,
            TransactionType::Deposit,
            ada.uid.clone(),
        );
        assert!(matches!(ledger.execute(unknown), Err(BankError::NotFound(_))));

        assert!(entries(&store).is_empty());
    }

    #[test]
    fn overlong_category_is_rejected() {
        let store = store();
        let ada = open_account(&store, "ada");
        let request = TransactionRequest::new(ada.account_number.clone(), 10, TransactionType::Deposit, ada.uid)
            .with_category("x".repeat(MAX_CATEGORY_CHARS + 1));
        assert!(matches!(executor(&store).execute(request), Err(BankError::InvalidArgument(_))));
    }

    #[test]
    fn explicit_timestamp_is_recorded() {
        let store = store();
        let ada = open_account(&store, "ada");
        let at = Utc.with_ymd_and_hms(2023, 7, 14, 9, 30, 0).unwrap();

        let receipt = executor(&store)
            .execute(
                TransactionRequest::new(ada.account_number.clone(), 10, TransactionType::Deposit, ada.uid).at(at),
            )
            .unwrap();

        let stored = store.fetch::<LedgerEntry>(&receipt.transaction_id).unwrap().unwrap();
        assert_eq!(stored.timestamp, at);
    }

    #[test]
    fn deposit_overflow_is_a_failed_precondition() {
        assert!(matches!(
            apply_movement(u64::MAX, 1, TransactionType::Deposit),
            Err(BankError::FailedPrecondition(_))
        ));
    }

    #[test]
    fn concurrent_movements_are_never_lost() {
        let store = store();
        let ada = open_account(&store, "ada");
        let threads = 8;
        let per_thread = 10;
        let ledger = LedgerTransactionExecutor::new(store.clone(), RetryPolicy::new(10_000));

        std::thread::scope(|scope| {
            for _ in 0..threads {
                scope.spawn(|| {
                    for _ in 0..per_thread {
                        ledger
                            .execute(TransactionRequest::new(
                                ada.account_number.clone(),
                                5,
                                TransactionType::Deposit,
                                ada.uid.clone(),
                            ))
                            .unwrap();
                    }
                });
            }
        });

        let final_balance = store.fetch::<Account>(&ada.id).unwrap().unwrap().balance_in_cents;
        assert_eq!(final_balance, 5 * threads * per_thread);

        let mut balances: Vec<u64> = entries(&store).iter().map(|e| e.new_balance_in_cents).collect();
        balances.sort_unstable();
        assert_eq!(balances, (1..=threads * per_thread).map(|i| i * 5).collect::<Vec<_>>());
    }

    fn withdrawals(store: &Arc<InMemoryDocumentStore>) -> usize {
        entries(store)
            .iter()
            .filter(|e| e.kind == TransactionType::Withdrawal)
            .count()
    }

    fn movement(account: &Account, amount: u64, kind: TransactionType) -> TransactionRequest {
        TransactionRequest::new(account.account_number.clone(), amount, kind, account.uid.clone())
    }

    #[test]
    fn exact_drain_then_one_cent_more_is_refused() {
        let store = store();
        let ada = open_account(&store, "ada");
        let ledger = executor(&store);

        ledger.execute(movement(&ada, 1_000, TransactionType::Deposit)).unwrap();
        let drained = ledger.execute(movement(&ada, 1_000, TransactionType::Withdrawal)).unwrap();
        assert_eq!(drained.new_balance_in_cents, 0);

        let err = ledger.execute(movement(&ada, 1, TransactionType::Withdrawal)).unwrap_err();
        assert!(matches!(err, BankError::FailedPrecondition(_)));

        assert_eq!(store.fetch::<Account>(&ada.id).unwrap().unwrap().balance_in_cents, 0);
        assert_eq!(entries(&store).len(), 2);
        assert_eq!(withdrawals(&store), 1);
    }

    #[test]
    fn racing_withdrawals_cannot_both_spend_the_balance() {
        for _ in 0..20 {
            let store = store();
            let ada = open_account(&store, "ada");
            let ledger = LedgerTransactionExecutor::new(store.clone(), RetryPolicy::new(10_000));
            ledger.execute(movement(&ada, 1_000, TransactionType::Deposit)).unwrap();

            let outcomes: Vec<BankResult<TransactionReceipt>> = std::thread::scope(|scope| {
                let handles: Vec<_> = (0..2)
                    .map(|_| scope.spawn(|| ledger.execute(movement(&ada, 600, TransactionType::Withdrawal))))
                    .collect();
                handles.into_iter().map(|h| h.join().unwrap()).collect()
            });

            assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
            assert_eq!(
                outcomes
                    .iter()
                    .filter(|r| matches!(r, Err(BankError::FailedPrecondition(_))))
                    .count(),
                1
            );
            assert_eq!(store.fetch::<Account>(&ada.id).unwrap().unwrap().balance_in_cents, 400);
            assert_eq!(withdrawals(&store), 1);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn balance_follows_reference_model(
            moves in proptest::collection::vec((any::<bool>(), 1u64..=5_000), 1..24)
        ) {
            let store = store();
            let ada = open_account(&store, "ada");
            let ledger = executor(&store);
            let mut expected = 0u64;
            let mut committed = 0usize;

            for (deposit, amount) in moves {
                let kind = if deposit { TransactionType::Deposit } else { TransactionType::Withdrawal };
                let result = ledger.execute(TransactionRequest::new(
                    ada.account_number.clone(),
                    amount,
                    kind,
                    ada.uid.clone(),
                ));

                match apply_movement(expected, amount, kind) {
                    Ok(next) => {
                        prop_assert_eq!(result.unwrap().new_balance_in_cents, next);
                        expected = next;
                        committed += 1;
                    }
                    Err(_) => prop_assert!(matches!(result, Err(BankError::FailedPrecondition(_)))),
                }
            }

            let account = AccountProvisioner::new(store.clone(), RetryPolicy::default(), "0001")
                .find_by_uid(&ada.uid)
                .unwrap()
                .unwrap();
            prop_assert_eq!(account.balance_in_cents, expected);
            prop_assert_eq!(entries(&store).len(), committed);
        }
    }
}
