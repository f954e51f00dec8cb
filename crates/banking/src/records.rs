//! Persisted records and their collections.
//!
//! Field names are camelCase on the wire; timestamps are stored as integer
//! microseconds since the epoch so range and order queries compare numerically.

use core::str::FromStr;

use chrono::serde::ts_microseconds;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use bankcore_core::{
    AccountId, BankError, CardId, CardTransactionId, Entity, EntryId, HealthCheckId, Uid,
};
use bankcore_store::Document;

use crate::identifier::{AccountNumber, CardNumber};

pub const ACCOUNTS: &str = "bank-accounts";
pub const COUNTERS: &str = "counters";
pub const LEDGER_ENTRIES: &str = "transactions";
pub const PAYMENT_CARDS: &str = "payment-cards";
pub const CARD_TRANSACTIONS: &str = "card-transactions";
pub const HEALTH_CHECKS: &str = "health-checks";

/// Current time at the precision records are stored with.
pub fn now() -> DateTime<Utc> {
    stored_precision(Utc::now())
}

pub fn stored_precision(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(6)
}

macro_rules! impl_document {
    ($t:ty, $id:ty, $field:ident, $collection:expr) => {
        impl Entity for $t {
            type Id = $id;

            fn id(&self) -> &Self::Id {
                &self.$field
            }
        }

        impl Document for $t {
            const COLLECTION: &'static str = $collection;
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub uid: Uid,
    pub account_number: AccountNumber,
    pub agency: String,
    pub balance_in_cents: u64,
    pub owner_name: String,
    pub owner_email: String,
    #[serde(with = "ts_microseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "ts_microseconds")]
    pub updated_at: DateTime<Utc>,
}

impl_document!(Account, AccountId, id, ACCOUNTS);

/// Named monotonic sequence; the record key is the sequence name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counter {
    pub name: String,
    pub current_value: u64,
}

impl_document!(Counter, String, name, COUNTERS);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "DEPOSIT",
            Self::Withdrawal => "WITHDRAWAL",
        }
    }
}

impl core::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = BankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEPOSIT" => Ok(Self::Deposit),
            "WITHDRAWAL" => Ok(Self::Withdrawal),
            other => Err(BankError::invalid_argument(format!(
                "transaction type must be DEPOSIT or WITHDRAWAL, got '{other}'"
            ))),
        }
    }
}

/// One committed balance movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: EntryId,
    pub account_id: AccountId,
    pub account_number: AccountNumber,
    pub uid: Uid,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount_in_cents: u64,
    pub new_balance_in_cents: u64,
    #[serde(with = "ts_microseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl_document!(LedgerEntry, EntryId, id, LEDGER_ENTRIES);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardType {
    Credit,
    Debit,
    Physical,
    Virtual,
}

impl CardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "CREDIT",
            Self::Debit => "DEBIT",
            Self::Physical => "PHYSICAL",
            Self::Virtual => "VIRTUAL",
        }
    }
}

impl core::fmt::Display for CardType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardType {
    type Err = BankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CREDIT" => Ok(Self::Credit),
            "DEBIT" => Ok(Self::Debit),
            "PHYSICAL" => Ok(Self::Physical),
            "VIRTUAL" => Ok(Self::Virtual),
            other => Err(BankError::invalid_argument(format!(
                "card type must be one of CREDIT, DEBIT, PHYSICAL, VIRTUAL; got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCard {
    pub id: CardId,
    pub account_id: AccountId,
    pub account_number: AccountNumber,
    pub uid: Uid,
    pub card_type: CardType,
    pub brand: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub card_number: CardNumber,
    pub masked_number: String,
    pub last_four_digits: String,
    pub invoice_amount_in_cents: u64,
    #[serde(default)]
    pub invoice_due_date: Option<String>,
    #[serde(default)]
    pub available_limit_in_cents: Option<u64>,
    #[serde(default)]
    pub credit_limit_in_cents: Option<u64>,
    #[serde(with = "ts_microseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "ts_microseconds")]
    pub updated_at: DateTime<Utc>,
}

impl_document!(PaymentCard, CardId, id, PAYMENT_CARDS);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardTransactionType {
    Debit,
    Credit,
    Purchase,
    Payment,
    Refund,
    Adjustment,
    #[default]
    Card,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardDirection {
    Debit,
    Credit,
}

/// Movement on a payment card. Written by upstream processors; read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardTransaction {
    pub id: CardTransactionId,
    pub card_id: CardId,
    pub account_id: AccountId,
    pub account_number: AccountNumber,
    pub uid: Uid,
    #[serde(rename = "type", default)]
    pub kind: CardTransactionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<CardDirection>,
    pub amount_in_cents: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(with = "ts_microseconds")]
    pub timestamp: DateTime<Utc>,
}

impl_document!(CardTransaction, CardTransactionId, id, CARD_TRANSACTIONS);

/// Probe written by the health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    pub id: HealthCheckId,
    pub uid: Uid,
    #[serde(with = "ts_microseconds")]
    pub timestamp: DateTime<Utc>,
}

impl_document!(HealthCheck, HealthCheckId, id, HEALTH_CHECKS);
