//! Core traits for the Ledger Store and its atomic units
//!
//! This module defines the seams between the transfer coordinator and the
//! storage backends, so the in-memory and PostgreSQL stores can be used
//! interchangeably.

use crate::types::{
    Account, AccountId, CreateAccountParams, Entry, EntryId, StoreError, Transfer, TransferId,
};
use async_trait::async_trait;

/// Limit/offset window for list operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }

    /// Clamp a page to sane bounds (non-negative offset, 1..=1000 rows)
    pub fn normalized(self) -> Self {
        Self {
            limit: self.limit.clamp(1, 1000),
            offset: self.offset.max(0),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
        }
    }
}

/// Durable entity storage shared by every request
///
/// Implementations are owned by the process and injected into the
/// coordinator. Reads made directly on the store only observe committed
/// state.
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    /// Atomic unit type produced by [`LedgerStore::begin`]
    type Unit: LedgerUnit;

    /// Open a new atomic unit of work
    async fn begin(&self) -> Result<Self::Unit, StoreError>;

    /// Open an account
    async fn create_account(&self, params: CreateAccountParams) -> Result<Account, StoreError>;

    /// Get an account by ID
    async fn get_account(&self, id: AccountId) -> Result<Account, StoreError>;

    /// List accounts ordered by ID
    async fn list_accounts(&self, page: Page) -> Result<Vec<Account>, StoreError>;

    /// Get an entry by ID
    async fn get_entry(&self, id: EntryId) -> Result<Entry, StoreError>;

    /// List the entries of one account ordered by ID
    async fn list_entries(
        &self,
        account_id: AccountId,
        page: Page,
    ) -> Result<Vec<Entry>, StoreError>;

    /// Get a transfer by ID
    async fn get_transfer(&self, id: TransferId) -> Result<Transfer, StoreError>;

    /// List transfers sent from `from_account_id` or received by `to_account_id`
    async fn list_transfers(
        &self,
        from_account_id: AccountId,
        to_account_id: AccountId,
        page: Page,
    ) -> Result<Vec<Transfer>, StoreError>;
}

/// One atomic unit of work against the store
///
/// Nothing written through a unit is visible to other units or to store
/// reads until [`LedgerUnit::commit`] succeeds. Dropping a unit without
/// committing it rolls it back.
#[async_trait]
pub trait LedgerUnit: Send {
    /// Insert a transfer row
    async fn create_transfer(
        &mut self,
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: i64,
    ) -> Result<Transfer, StoreError>;

    /// Insert an entry row
    async fn create_entry(&mut self, account_id: AccountId, amount: i64)
        -> Result<Entry, StoreError>;

    /// Atomically add `delta` to an account balance and return the updated row
    ///
    /// Takes the account's row lock, which stays held until the unit ends.
    async fn add_account_balance(
        &mut self,
        account_id: AccountId,
        delta: i64,
    ) -> Result<Account, StoreError>;

    /// Read an account under its row lock
    async fn get_account_for_update(&mut self, account_id: AccountId)
        -> Result<Account, StoreError>;

    /// Make every write of this unit visible and release its locks
    async fn commit(self) -> Result<(), StoreError>;

    /// Discard every write of this unit and release its locks
    async fn rollback(self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::in_bounds(Page::new(10, 5), Page::new(10, 5))]
    #[case::zero_limit(Page::new(0, 0), Page::new(1, 0))]
    #[case::huge_limit(Page::new(50_000, 0), Page::new(1000, 0))]
    #[case::negative_offset(Page::new(10, -3), Page::new(10, 0))]
    fn test_page_normalized(#[case] page: Page, #[case] expected: Page) {
        assert_eq!(page.normalized(), expected);
    }
}
