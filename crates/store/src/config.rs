//! Store configuration loaded from the environment.

use crate::atomic::RetryPolicy;

/// Environment variable overriding the transaction attempt budget.
pub const TX_MAX_ATTEMPTS_ENV: &str = "BANKCORE_TX_MAX_ATTEMPTS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Attempts a unit of work gets before contention surfaces as an error.
    pub max_transaction_attempts: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_transaction_attempts: RetryPolicy::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Invalid values are logged and replaced
    /// by the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(TX_MAX_ATTEMPTS_ENV) {
            match raw.trim().parse::<u32>() {
                Ok(attempts) if attempts >= 1 => config.max_transaction_attempts = attempts,
                _ => tracing::warn!(
                    value = %raw,
                    "{TX_MAX_ATTEMPTS_ENV} must be a positive integer; using default"
                ),
            }
        }

        config
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_transaction_attempts)
    }
}
