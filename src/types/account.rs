//! Account-related types for the ledger
//!
//! This module defines the Account row and the parameters used to open a new
//! account in the Ledger Store.

use super::error::LedgerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account identifier
///
/// Opaque, unique and totally ordered. The ordering is what the lock-order
/// policy relies on.
pub type AccountId = i64;

/// Currency codes accepted when opening an account
pub const SUPPORTED_CURRENCIES: &[&str] = &[
    "USD", "EUR", "GBP", "CHF", "JPY", "CAD", "AUD", "NZD", "CZK", "PLN", "SEK", "NOK", "DKK",
    "HUF", "CNY", "HKD", "SGD", "INR", "BRL", "MXN", "ZAR", "BTC", "ETH", "USDT",
];

/// Check whether a currency code is supported
pub fn is_supported_currency(currency: &str) -> bool {
    SUPPORTED_CURRENCIES.contains(&currency)
}

/// Account state
///
/// Holder of a balance in the ledger. Accounts are long-lived and mutated in
/// place by balance adjustments only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique account identifier
    pub id: AccountId,

    /// Owner reference (user name in the surrounding system)
    pub owner: String,

    /// Balance in minor currency units
    ///
    /// The store refuses any update that would make this negative.
    pub balance: i64,

    /// Currency code, e.g. `USD`
    pub currency: String,

    /// When the account was opened
    pub created_at: DateTime<Utc>,
}

/// Parameters for opening an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAccountParams {
    pub owner: String,
    pub balance: i64,
    pub currency: String,
}

impl CreateAccountParams {
    pub fn new(owner: impl Into<String>, balance: i64, currency: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            balance,
            currency: currency.into(),
        }
    }

    /// Validate the shape of the request before it reaches the store
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the owner is non-empty, the balance is non-negative and
    ///   the currency is supported
    /// * `Err(LedgerError::InvalidArgument)` otherwise
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.owner.trim().is_empty() {
            return Err(LedgerError::invalid_argument("account owner must not be empty"));
        }
        if self.balance < 0 {
            return Err(LedgerError::invalid_argument(format!(
                "opening balance must not be negative, got {}",
                self.balance
            )));
        }
        if !is_supported_currency(&self.currency) {
            return Err(LedgerError::invalid_argument(format!(
                "unsupported currency '{}'",
                self.currency
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_validate_accepts_well_formed_params() {
        let params = CreateAccountParams::new("alice", 1000, "USD");
        assert!(params.validate().is_ok());
    }

    #[rstest]
    #[case::empty_owner(CreateAccountParams::new("  ", 10, "USD"), "owner")]
    #[case::negative_balance(CreateAccountParams::new("bob", -1, "USD"), "negative")]
    #[case::unknown_currency(CreateAccountParams::new("bob", 10, "XYZ"), "unsupported currency")]
    #[case::lowercase_currency(CreateAccountParams::new("bob", 10, "usd"), "unsupported currency")]
    fn test_validate_rejects(#[case] params: CreateAccountParams, #[case] expected: &str) {
        let err = params.validate().unwrap_err();
        assert!(matches!(err, LedgerError::InvalidArgument { .. }));
        assert!(err.to_string().contains(expected), "got: {}", err);
    }
}
