//! Caller-facing bank operations.
//!
//! Every operation takes the verified caller identity (`None` when the request was
//! not authenticated), parses raw caller input, and delegates to the components.

use std::sync::Arc;

use chrono::{Datelike, Utc};

use bankcore_core::{BankError, BankResult, CardId, HealthCheckId, Identity};
use bankcore_store::{DocumentStore, InMemoryDocumentStore, RetryPolicy, run_atomic};

use crate::account::{AccountProvisioner, EnsureAccount, Provisioned};
use crate::cards::{CardIssuer, DEFAULT_TRANSACTION_LIMIT, NewCard};
use crate::config::BankConfig;
use crate::counter::CounterAllocator;
use crate::identifier::AccountNumber;
use crate::ledger::{LedgerTransactionExecutor, TransactionReceipt, TransactionRequest};
use crate::records::{self, Account, CardTransaction, CardType, HealthCheck, PaymentCard, TransactionType};
use crate::statement::{
    DEFAULT_PAGE, DEFAULT_PAGE_SIZE, StatementPage, StatementPaginator, YearlyStatement, validate_page,
    validate_year,
};

#[derive(Debug, Clone)]
pub struct Bank<S> {
    store: S,
    retry: RetryPolicy,
    counters: CounterAllocator<S>,
    accounts: AccountProvisioner<S>,
    ledger: LedgerTransactionExecutor<S>,
    statements: StatementPaginator<S>,
    cards: CardIssuer<S>,
}

impl Bank<Arc<InMemoryDocumentStore>> {
    pub fn in_memory(config: &BankConfig) -> Self {
        Self::new(Arc::new(InMemoryDocumentStore::new()), config)
    }
}

impl<S: DocumentStore + Clone> Bank<S> {
    pub fn new(store: S, config: &BankConfig) -> Self {
        let retry = config.store.retry_policy();
        let accounts = AccountProvisioner::new(store.clone(), retry, config.agency.clone());

        Self {
            counters: CounterAllocator::new(store.clone(), retry),
            ledger: LedgerTransactionExecutor::new(store.clone(), retry),
            statements: StatementPaginator::new(store.clone()),
            cards: CardIssuer::new(store.clone(), retry, accounts.clone(), config.card_policy()),
            accounts,
            store,
            retry,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn counters(&self) -> &CounterAllocator<S> {
        &self.counters
    }

    pub fn accounts(&self) -> &AccountProvisioner<S> {
        &self.accounts
    }

    pub fn ledger(&self) -> &LedgerTransactionExecutor<S> {
        &self.ledger
    }

    pub fn statements(&self) -> &StatementPaginator<S> {
        &self.statements
    }

    pub fn cards(&self) -> &CardIssuer<S> {
        &self.cards
    }

    fn own_account(&self, caller: &Identity) -> BankResult<Account> {
        self.accounts
            .find_by_uid(&caller.uid)?
            .ok_or_else(|| BankError::not_found("no bank account exists for the authenticated user"))
    }

    /// Resolve the account an operation targets: the caller's own, optionally
    /// confirmed by an explicit account number.
    fn target_account(&self, caller: &Identity, account_number: Option<&str>) -> BankResult<Account> {
        let requested = account_number
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(AccountNumber::parse)
            .transpose()?;
        let account = self.own_account(caller)?;

        match requested {
            Some(number) if number != account.account_number => Err(BankError::permission_denied(
                "account does not belong to the authenticated user",
            )),
            _ => Ok(account),
        }
    }

    /// Open the caller's account, or return the existing one. The owner name
    /// defaults to the identity's display name; the email always comes from the
    /// identity.
    pub fn create_account(&self, caller: Option<&Identity>, owner_name: Option<&str>) -> BankResult<Provisioned> {
        let caller = Identity::require(caller)?;
        self.accounts.ensure_account(EnsureAccount {
            uid: &caller.uid,
            owner_name: owner_name.or(caller.display_name.as_deref()),
            owner_email: caller.email.as_deref(),
            allow_create: true,
        })
    }

    pub fn account_details(&self, caller: Option<&Identity>) -> BankResult<Account> {
        let caller = Identity::require(caller)?;
        self.own_account(caller)
    }

    pub fn perform_transaction(
        &self,
        caller: Option<&Identity>,
        account_number: &str,
        amount_in_cents: u64,
        kind: &str,
        category: Option<&str>,
    ) -> BankResult<TransactionReceipt> {
        let caller = Identity::require(caller)?;
        let account_number = AccountNumber::parse(account_number)?;
        let kind: TransactionType = kind.parse()?;

        let mut request = TransactionRequest::new(account_number, amount_in_cents, kind, caller.uid.clone());
        request.category = category.map(str::to_string);
        self.ledger.execute(request)
    }

    pub fn statement(
        &self,
        caller: Option<&Identity>,
        account_number: Option<&str>,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> BankResult<StatementPage> {
        let caller = Identity::require(caller)?;
        let page = page.unwrap_or(DEFAULT_PAGE);
        let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        validate_page(page, page_size)?;

        let account = self.target_account(caller, account_number)?;
        self.statements.page(&account.account_number, page, page_size)
    }

    /// Entries of one calendar year grouped by month; the year defaults to the
    /// current UTC year.
    pub fn yearly_transactions(
        &self,
        caller: Option<&Identity>,
        year: Option<i32>,
        account_number: Option<&str>,
    ) -> BankResult<YearlyStatement> {
        let caller = Identity::require(caller)?;
        let year = year.unwrap_or_else(|| Utc::now().year());
        validate_year(year)?;

        let account = self.target_account(caller, account_number)?;
        self.statements.yearly_for(&account.account_number, year)
    }

    pub fn create_card(
        &self,
        caller: Option<&Identity>,
        card_type: &str,
        label: Option<&str>,
        brand: Option<&str>,
    ) -> BankResult<PaymentCard> {
        let caller = Identity::require(caller)?;
        let card_type: CardType = card_type.parse()?;
        self.cards.create(
            caller,
            NewCard {
                card_type,
                label: label.map(str::to_string),
                brand: brand.map(str::to_string),
            },
        )
    }

    pub fn list_cards(&self, caller: Option<&Identity>) -> BankResult<Vec<PaymentCard>> {
        let caller = Identity::require(caller)?;
        self.cards.list(&caller.uid)
    }

    pub fn delete_card(&self, caller: Option<&Identity>, card_id: &str) -> BankResult<usize> {
        let caller = Identity::require(caller)?;
        let card_id: CardId = card_id.parse()?;
        self.cards.delete(&caller.uid, &card_id)
    }

    pub fn card_transactions(
        &self,
        caller: Option<&Identity>,
        card_id: &str,
        limit: Option<u32>,
    ) -> BankResult<Vec<CardTransaction>> {
        let caller = Identity::require(caller)?;
        let card_id: CardId = card_id.parse()?;
        self.cards
            .transactions(&caller.uid, &card_id, limit.unwrap_or(DEFAULT_TRANSACTION_LIMIT))
    }

    /// Write a health-check record, proving the store accepts commits.
    pub fn health_check(&self, caller: Option<&Identity>) -> BankResult<HealthCheckId> {
        let caller = Identity::require(caller)?;
        let check = HealthCheck {
            id: HealthCheckId::new(),
            uid: caller.uid.clone(),
            timestamp: records::now(),
        };

        run_atomic(&self.store, self.retry, |tx| tx.put(&check))?;
        tracing::debug!(uid = %caller.uid, check_id = %check.id, "health check recorded");
        Ok(check.id)
    }
}
