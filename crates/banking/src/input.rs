//! Normalization of free-text caller input.

use bankcore_core::{BankError, BankResult};

/// Trim an optional text field; blank becomes `None`, overlong is rejected.
pub fn optional_text(field: &str, value: Option<&str>, max_chars: usize) -> BankResult<Option<String>> {
    let Some(trimmed) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    if trimmed.chars().count() > max_chars {
        return Err(BankError::invalid_argument(format!(
            "{field} must be at most {max_chars} characters"
        )));
    }

    Ok(Some(trimmed.to_string()))
}

/// Trim a required text field; missing or blank is rejected.
pub fn required_text(field: &str, value: Option<&str>) -> BankResult<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| BankError::invalid_argument(format!("{field} is required")))
}
