//! `bankcore-banking`: the retail banking core.
//!
//! Components, bottom-up:
//! - [`counter`]: named monotonic sequences.
//! - [`identifier`]: account numbers (`NNNNNN-D`, modulo-11 check digit) and card numbers.
//! - [`account`]: one account per user, provisioned on demand.
//! - [`ledger`]: deposits and withdrawals with an entry per movement.
//! - [`statement`]: paged statements and calendar-year views.
//! - [`cards`]: payment card issue, listing, deletion and transaction history.
//! - [`service`]: the authenticated [`Bank`] facade over all of the above.
//!
//! Every write path runs as one serializable unit of work through
//! [`bankcore_store::run_atomic`].

pub mod account;
pub mod cards;
pub mod config;
pub mod counter;
pub mod identifier;
pub mod input;
pub mod ledger;
pub mod records;
pub mod service;
pub mod statement;

pub use account::{AccountProvisioner, EnsureAccount, Provisioned};
pub use cards::{CardIssuer, CardPolicy, NewCard};
pub use config::BankConfig;
pub use counter::CounterAllocator;
pub use identifier::{AccountNumber, CardNumber, CardPrefix, check_digit};
pub use ledger::{LedgerTransactionExecutor, TransactionReceipt, TransactionRequest};
pub use records::{
    Account, CardDirection, CardTransaction, CardTransactionType, CardType, Counter, HealthCheck,
    LedgerEntry, PaymentCard, TransactionType,
};
pub use service::Bank;
pub use statement::{MonthlyEntries, StatementPage, StatementPaginator, YearlyStatement};
