//! Bank configuration loaded from the environment.

use bankcore_store::StoreConfig;

use crate::account::DEFAULT_AGENCY;
use crate::cards::{CardPolicy, DEFAULT_BRAND, DEFAULT_CREDIT_LIMIT_IN_CENTS, DEFAULT_INVOICE_DUE_DAY};
use crate::identifier::CardPrefix;

pub const AGENCY_ENV: &str = "BANKCORE_AGENCY";
pub const CARD_PREFIX_ENV: &str = "BANKCORE_CARD_PREFIX";
pub const CARD_BRAND_ENV: &str = "BANKCORE_CARD_BRAND";
pub const CREDIT_LIMIT_ENV: &str = "BANKCORE_CREDIT_LIMIT_CENTS";
pub const INVOICE_DUE_DAY_ENV: &str = "BANKCORE_INVOICE_DUE_DAY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankConfig {
    pub agency: String,
    pub card_prefix: CardPrefix,
    pub default_card_brand: String,
    pub credit_limit_in_cents: u64,
    /// Day of month CREDIT invoices fall due, 1..=31.
    pub invoice_due_day: u8,
    pub store: StoreConfig,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            agency: DEFAULT_AGENCY.to_string(),
            card_prefix: CardPrefix::default(),
            default_card_brand: DEFAULT_BRAND.to_string(),
            credit_limit_in_cents: DEFAULT_CREDIT_LIMIT_IN_CENTS,
            invoice_due_day: DEFAULT_INVOICE_DUE_DAY,
            store: StoreConfig::default(),
        }
    }
}

impl BankConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Invalid values are logged and the
    /// default kept.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self {
            store: StoreConfig::from_lookup(&lookup),
            ..Self::default()
        };

        if let Some(raw) = lookup(AGENCY_ENV) {
            match raw.trim() {
                "" => tracing::warn!("{AGENCY_ENV} is blank; using default"),
                agency => config.agency = agency.to_string(),
            }
        }

        if let Some(raw) = lookup(CARD_PREFIX_ENV) {
            match CardPrefix::parse(&raw) {
                Ok(prefix) => config.card_prefix = prefix,
                Err(err) => tracing::warn!(value = %raw, error = %err, "invalid {CARD_PREFIX_ENV}; using default"),
            }
        }

        if let Some(raw) = lookup(CARD_BRAND_ENV) {
            match raw.trim() {
                "" => tracing::warn!("{CARD_BRAND_ENV} is blank; using default"),
                brand => config.default_card_brand = brand.to_string(),
            }
        }

        if let Some(raw) = lookup(CREDIT_LIMIT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(limit) => config.credit_limit_in_cents = limit,
                Err(_) => tracing::warn!(value = %raw, "{CREDIT_LIMIT_ENV} must be a whole number of cents; using default"),
            }
        }

        if let Some(raw) = lookup(INVOICE_DUE_DAY_ENV) {
            match raw.trim().parse::<u8>() {
                Ok(day) if (1..=31).contains(&day) => config.invoice_due_day = day,
                _ => tracing::warn!(value = %raw, "{INVOICE_DUE_DAY_ENV} must be between 1 and 31; using default"),
            }
        }

        config
    }

    pub fn card_policy(&self) -> CardPolicy {
        CardPolicy {
            prefix: self.card_prefix.clone(),
            default_brand: self.default_card_brand.clone(),
            credit_limit_in_cents: self.credit_limit_in_cents,
            invoice_due_day: self.invoice_due_day,
        }
    }
}
