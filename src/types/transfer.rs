//! Transfer-related types for the ledger
//!
//! This module defines the transfer record, the request parameters accepted by
//! the coordinator and the composed result of a committed transfer.

use super::account::{Account, AccountId};
use super::entry::Entry;
use super::error::LedgerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transfer identifier
pub type TransferId = i64;

/// Immutable record of a two-sided movement of funds
///
/// A transfer always owns exactly two entries: a debit of `amount` on the
/// source account and a credit of `amount` on the destination account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,

    /// Positive amount in minor units
    pub amount: i64,

    pub created_at: DateTime<Utc>,
}

/// Transfer request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferParams {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: i64,
}

impl TransferParams {
    pub fn new(from_account_id: AccountId, to_account_id: AccountId, amount: i64) -> Self {
        Self {
            from_account_id,
            to_account_id,
            amount,
        }
    }

    /// Reject requests that can never succeed
    ///
    /// Runs before any atomic unit is opened, so a rejected request never
    /// touches the store.
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the amount is positive and the accounts differ
    /// * `Err(LedgerError::InvalidArgument)` otherwise
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.amount <= 0 {
            return Err(LedgerError::invalid_argument(format!(
                "transfer amount must be positive, got {}",
                self.amount
            )));
        }
        if self.from_account_id == self.to_account_id {
            return Err(LedgerError::invalid_argument(format!(
                "cannot transfer from account {} to itself",
                self.from_account_id
            )));
        }
        Ok(())
    }
}

/// Outcome of a committed transfer
///
/// Aggregates the created transfer, both entries and the post-update
/// snapshots of both accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    pub transfer: Transfer,
    pub from_entry: Entry,
    pub to_entry: Entry,
    pub from_account: Account,
    pub to_account: Account,
}

impl TransferResult {
    /// Double-entry symmetry: `from_entry == -to_entry == -transfer.amount`
    pub fn is_balanced(&self) -> bool {
        self.from_entry.amount == -self.transfer.amount
            && self.to_entry.amount == self.transfer.amount
            && self.from_entry.account_id == self.transfer.from_account_id
            && self.to_entry.account_id == self.transfer.to_account_id
    }
}
