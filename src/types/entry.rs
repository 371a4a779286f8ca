//! Ledger entry type
//!
//! An entry is one signed movement against a single account's balance. Entries
//! are append-only: created once per transfer per participating account and
//! never mutated afterwards.

use super::account::AccountId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entry identifier
pub type EntryId = i64;

/// Immutable ledger line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,

    /// Account this entry moves funds on
    pub account_id: AccountId,

    /// Signed amount in minor units (negative = debit, positive = credit)
    pub amount: i64,

    pub created_at: DateTime<Utc>,
}

impl Entry {
    pub fn is_debit(&self) -> bool {
        self.amount < 0
    }

    pub fn is_credit(&self) -> bool {
        self.amount > 0
    }
}
