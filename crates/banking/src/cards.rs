//! Payment cards linked to the caller's account.

use bankcore_core::{BankError, BankResult, CardId, Identity, Uid};
use bankcore_store::{
    Document, DocumentStore, DocumentStoreExt, Query, RetryPolicy, SortOrder, run_atomic,
};

use crate::account::{AccountProvisioner, OwnerDetails, Provisioned};
use crate::counter::{CARD_NUMBER_SEQUENCE, allocate_in};
use crate::identifier::{CardNumber, CardPrefix};
use crate::input::optional_text;
use crate::records::{self, CardTransaction, CardType, PaymentCard};

pub const MAX_LABEL_CHARS: usize = 80;
pub const MAX_BRAND_CHARS: usize = 80;
pub const DEFAULT_TRANSACTION_LIMIT: u32 = 20;
pub const MAX_TRANSACTION_LIMIT: u32 = 50;
pub const DEFAULT_BRAND: &str = "ByteBank";
pub const DEFAULT_CREDIT_LIMIT_IN_CENTS: u64 = 250_000;
pub const DEFAULT_INVOICE_DUE_DAY: u8 = 15;
const FALLBACK_OWNER_NAME: &str = "Cliente";

/// Issuer-wide card settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardPolicy {
    pub prefix: CardPrefix,
    pub default_brand: String,
    pub credit_limit_in_cents: u64,
    pub invoice_due_day: u8,
}

impl Default for CardPolicy {
    fn default() -> Self {
        Self {
            prefix: CardPrefix::default(),
            default_brand: DEFAULT_BRAND.to_string(),
            credit_limit_in_cents: DEFAULT_CREDIT_LIMIT_IN_CENTS,
            invoice_due_day: DEFAULT_INVOICE_DUE_DAY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCard {
    pub card_type: CardType,
    pub label: Option<String>,
    pub brand: Option<String>,
}

impl NewCard {
    pub fn new(card_type: CardType) -> Self {
        Self {
            card_type,
            label: None,
            brand: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }
}

/// Type-dependent starting values of a card.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CardTerms {
    invoice_due_date: Option<String>,
    credit_limit_in_cents: Option<u64>,
    available_limit_in_cents: Option<u64>,
}

impl CardTerms {
    fn for_type(card_type: CardType, policy: &CardPolicy) -> Self {
        match card_type {
            CardType::Credit => Self {
                invoice_due_date: Some(policy.invoice_due_day.to_string()),
                credit_limit_in_cents: Some(policy.credit_limit_in_cents),
                available_limit_in_cents: Some(policy.credit_limit_in_cents),
            },
            CardType::Debit | CardType::Physical | CardType::Virtual => Self {
                invoice_due_date: None,
                credit_limit_in_cents: None,
                available_limit_in_cents: None,
            },
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn ensure_owner(card: &PaymentCard, uid: &Uid) -> BankResult<()> {
    if &card.uid != uid {
        return Err(BankError::permission_denied(
            "card does not belong to the authenticated user",
        ));
    }
    Ok(())
}

fn card_not_found(card_id: &CardId) -> BankError {
    BankError::not_found(format!("card {card_id} not found"))
}

#[derive(Debug, Clone)]
pub struct CardIssuer<S> {
    store: S,
    retry: RetryPolicy,
    accounts: AccountProvisioner<S>,
    policy: CardPolicy,
}

impl<S: DocumentStore> CardIssuer<S> {
    pub fn new(store: S, retry: RetryPolicy, accounts: AccountProvisioner<S>, policy: CardPolicy) -> Self {
        Self {
            store,
            retry,
            accounts,
            policy,
        }
    }

    /// Issue a card on the owner's account, provisioning the account if needed.
    ///
    /// A newly provisioned account and the card commit together: if the card cannot
    /// be issued, no account is left behind.
    pub fn create(&self, owner: &Identity, request: NewCard) -> BankResult<PaymentCard> {
        let label = optional_text("label", request.label.as_deref(), MAX_LABEL_CHARS)?;
        let brand = optional_text("brand", request.brand.as_deref(), MAX_BRAND_CHARS)?
            .unwrap_or_else(|| self.policy.default_brand.clone());

        let owner_name = non_blank(owner.display_name.as_deref())
            .or_else(|| non_blank(owner.email.as_deref()))
            .or(label.as_deref())
            .unwrap_or(FALLBACK_OWNER_NAME);
        let owner_details = OwnerDetails::parse(Some(owner_name), owner.email.as_deref());

        let terms = CardTerms::for_type(request.card_type, &self.policy);

        let (card, account_created) = run_atomic(&self.store, self.retry, |tx| {
            let Provisioned { account, created } =
                self.accounts.ensure_in(tx, &owner.uid, &owner_details)?;

            let serial = allocate_in(tx, CARD_NUMBER_SEQUENCE)?;
            let card_number = CardNumber::from_serial(&self.policy.prefix, serial)?;
            let now = records::now();

            let card = PaymentCard {
                id: CardId::new(),
                account_id: account.id,
                account_number: account.account_number,
                uid: owner.uid.clone(),
                card_type: request.card_type,
                brand: brand.clone(),
                label: label.clone(),
                masked_number: card_number.masked(),
                last_four_digits: card_number.last_four().to_string(),
                card_number,
                invoice_amount_in_cents: 0,
                invoice_due_date: terms.invoice_due_date.clone(),
                available_limit_in_cents: terms.available_limit_in_cents,
                credit_limit_in_cents: terms.credit_limit_in_cents,
                created_at: now,
                updated_at: now,
            };
            tx.put(&card)?;
            Ok::<_, BankError>((card, created))
        })?;

        if account_created {
            tracing::info!(
                uid = %owner.uid,
                account_number = %card.account_number,
                "bank account created"
            );
        }
        tracing::info!(
            card_id = %card.id,
            card_type = %card.card_type,
            account_number = %card.account_number,
            last_four = %card.last_four_digits,
            "payment card issued"
        );

        Ok(card)
    }

    /// The caller's cards, newest first.
    pub fn list(&self, uid: &Uid) -> BankResult<Vec<PaymentCard>> {
        let query = Query::of::<PaymentCard>()
            .where_eq("uid", uid.as_str())
            .order_by("createdAt", SortOrder::Descending)
            .order_by("cardNumber", SortOrder::Descending);
        Ok(self.store.find_lenient::<PaymentCard>(&query)?)
    }

    /// Delete a card together with its transactions. Returns how many transactions
    /// were removed.
    pub fn delete(&self, uid: &Uid, card_id: &CardId) -> BankResult<usize> {
        let removed = run_atomic(&self.store, self.retry, |tx| {
            let card = tx
                .get::<PaymentCard>(card_id)?
                .ok_or_else(|| card_not_found(card_id))?;
            ensure_owner(&card, uid)?;

            let keys = tx.find_keys(
                &Query::of::<CardTransaction>().where_eq("cardId", card_id.to_string()),
            )?;
            for key in &keys {
                tx.delete_key(CardTransaction::COLLECTION, key)?;
            }
            tx.delete::<PaymentCard>(card_id)?;

            Ok::<_, BankError>(keys.len())
        })?;

        tracing::info!(card_id = %card_id, removed_transactions = removed, "payment card deleted");
        Ok(removed)
    }

    /// Most recent transactions of one of the caller's cards. Records that cannot be
    /// decoded are skipped.
    ///
    /// `limit` is applied before decoding, so skipped records still count toward it.
    pub fn transactions(&self, uid: &Uid, card_id: &CardId, limit: u32) -> BankResult<Vec<CardTransaction>> {
        if !(1..=MAX_TRANSACTION_LIMIT).contains(&limit) {
            return Err(BankError::invalid_argument(format!(
                "limit must be between 1 and {MAX_TRANSACTION_LIMIT}"
            )));
        }

        let card = self
            .store
            .fetch::<PaymentCard>(card_id)?
            .ok_or_else(|| card_not_found(card_id))?;
        ensure_owner(&card, uid)?;

        let query = Query::of::<CardTransaction>()
            .where_eq("cardId", card_id.to_string())
            .order_by("timestamp", SortOrder::Descending)
            .limit(limit as usize);
        Ok(self.store.find_lenient::<CardTransaction>(&query)?)
    }
}
