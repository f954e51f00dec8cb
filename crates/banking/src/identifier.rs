//! Account and card number formatting.
//!
//! Account numbers are `NNNNNN-D`: a 6-digit zero-padded serial plus a weighted
//! modulo-11 check digit. Card numbers are 16 digits: a 6-digit brand prefix followed
//! by a 10-digit zero-padded serial.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use bankcore_core::{BankError, BankResult};

pub const ACCOUNT_BASE_DIGITS: usize = 6;
const MAX_ACCOUNT_SERIAL: u64 = 999_999;

pub const CARD_NUMBER_DIGITS: usize = 16;
pub const CARD_PREFIX_DIGITS: usize = 6;
const CARD_SERIAL_DIGITS: usize = CARD_NUMBER_DIGITS - CARD_PREFIX_DIGITS;
const MAX_CARD_SERIAL: u64 = 9_999_999_999;

pub const DEFAULT_CARD_PREFIX: &str = "637512";

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Weighted modulo-11 check digit over a string of decimal digits.
///
/// Digits are weighted right-to-left 2, 3, 4, 5, 6, 7, 2, 3, ...; the digit is
/// `11 - (sum mod 11)`, with 10 and 11 collapsing to 0.
pub fn check_digit(base: &str) -> u32 {
    let mut sum = 0;
    let mut weight = 2;

    for digit in base.chars().rev().filter_map(|c| c.to_digit(10)) {
        sum += digit * weight;
        weight = if weight < 7 { weight + 1 } else { 2 };
    }

    let digit = 11 - (sum % 11);
    if digit >= 10 { 0 } else { digit }
}

/// Account number in `NNNNNN-D` form with a verified check digit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountNumber(String);

impl AccountNumber {
    /// Format an allocated serial.
    pub fn from_serial(serial: u64) -> BankResult<Self> {
        if serial > MAX_ACCOUNT_SERIAL {
            tracing::error!(serial, "account number space exhausted");
            return Err(BankError::Internal);
        }

        let base = format!("{serial:0width$}", width = ACCOUNT_BASE_DIGITS);
        let digit = check_digit(&base);
        Ok(Self(format!("{base}-{digit}")))
    }

    /// Parse caller input, validating shape and check digit.
    pub fn parse(input: &str) -> BankResult<Self> {
        let trimmed = input.trim();
        let Some((base, digit)) = trimmed.split_once('-') else {
            return Err(BankError::invalid_argument(format!(
                "account number '{trimmed}' must have the form NNNNNN-D"
            )));
        };

        if base.len() != ACCOUNT_BASE_DIGITS || !all_digits(base) || digit.len() != 1 || !all_digits(digit)
        {
            return Err(BankError::invalid_argument(format!(
                "account number '{trimmed}' must have the form NNNNNN-D"
            )));
        }

        if digit.parse::<u32>().ok() != Some(check_digit(base)) {
            return Err(BankError::invalid_argument(format!(
                "account number '{trimmed}' has an invalid check digit"
            )));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn base(&self) -> &str {
        &self.0[..ACCOUNT_BASE_DIGITS]
    }
}

impl core::fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AccountNumber {
    type Err = BankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AccountNumber {
    type Error = BankError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AccountNumber> for String {
    fn from(value: AccountNumber) -> Self {
        value.0
    }
}

/// Six-digit issuer prefix every card number starts with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CardPrefix(String);

impl CardPrefix {
    pub fn parse(input: &str) -> BankResult<Self> {
        let trimmed = input.trim();
        if trimmed.len() != CARD_PREFIX_DIGITS || !all_digits(trimmed) {
            return Err(BankError::invalid_argument(format!(
                "card prefix must be exactly {CARD_PREFIX_DIGITS} digits"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CardPrefix {
    fn default() -> Self {
        Self(DEFAULT_CARD_PREFIX.to_string())
    }
}

/// 16-digit card number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardNumber(String);

impl CardNumber {
    /// Prefix followed by the zero-padded serial. The prefix is never truncated; a
    /// serial wider than the remaining digits means the number space is used up.
    pub fn from_serial(prefix: &CardPrefix, serial: u64) -> BankResult<Self> {
        if serial > MAX_CARD_SERIAL {
            tracing::error!(serial, prefix = prefix.as_str(), "card number space exhausted");
            return Err(BankError::Internal);
        }

        Ok(Self(format!(
            "{}{serial:0width$}",
            prefix.as_str(),
            width = CARD_SERIAL_DIGITS
        )))
    }

    pub fn parse(input: &str) -> BankResult<Self> {
        let trimmed = input.trim();
        if trimmed.len() != CARD_NUMBER_DIGITS || !all_digits(trimmed) {
            return Err(BankError::invalid_argument(format!(
                "card number must be exactly {CARD_NUMBER_DIGITS} digits"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn last_four(&self) -> &str {
        &self.0[CARD_NUMBER_DIGITS - 4..]
    }

    /// All but the last four digits replaced by `*`, grouped in blocks of four.
    pub fn masked(&self) -> String {
        let visible_from = self.0.len() - 4;
        let masked: Vec<char> = self
            .0
            .chars()
            .enumerate()
            .map(|(i, c)| if i < visible_from { '*' } else { c })
            .collect();

        masked
            .chunks(4)
            .map(|block| block.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl core::fmt::Display for CardNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CardNumber {
    type Error = BankError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CardNumber> for String {
    fn from(value: CardNumber) -> Self {
        value.0
    }
}
