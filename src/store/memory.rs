//! In-memory Ledger Store with row-level locking
//!
//! This module provides `MemoryStore`, a relational-engine stand-in that gives
//! the coordinator the same guarantees a database would:
//!
//! - Committed tables live in `DashMap`s; reads only ever see committed rows.
//! - Each account row has its own `tokio::sync::Mutex`. A unit takes the lock
//!   on first touch and holds it until it commits, rolls back or is dropped.
//! - Lock waits are bounded by `MemoryStoreConfig::lock_timeout`, so a lock
//!   cycle surfaces as `StoreError::LockTimeout` instead of hanging forever.
//! - Check constraints and foreign keys mirror `db/schema.sql`.
//!
//! # Thread Safety
//!
//! `MemoryStore` is cheap to clone and every clone shares the same tables.
//! Units on disjoint accounts never wait on each other.

use crate::core::traits::{LedgerStore, LedgerUnit, Page};
use crate::types::{
    Account, AccountId, CreateAccountParams, Entity, Entry, EntryId, StoreError, Transfer,
    TransferId,
};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::{DashMap, DashSet};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub const BALANCE_NON_NEGATIVE: &str = "accounts_balance_non_negative";
pub const BALANCE_RANGE: &str = "accounts_balance_range";
pub const TRANSFER_AMOUNT_POSITIVE: &str = "transfers_amount_positive";

/// Store operations that can be made to fail on purpose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Begin,
    CreateTransfer,
    CreateEntry,
    AddAccountBalance,
    Commit,
    Rollback,
}

/// Configuration for the in-memory store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryStoreConfig {
    /// Longest a unit waits for a row lock before giving up
    pub lock_timeout: Duration,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(5),
        }
    }
}

impl MemoryStoreConfig {
    /// Create a new MemoryStoreConfig, falling back to defaults for zero values
    pub fn new(lock_timeout: Duration) -> Self {
        let default = Self::default();

        let lock_timeout = if lock_timeout.is_zero() {
            tracing::warn!(
                default_ms = default.lock_timeout.as_millis() as u64,
                "Invalid lock_timeout (0), using default"
            );
            default.lock_timeout
        } else {
            lock_timeout
        };

        Self { lock_timeout }
    }
}

#[derive(Debug, Default)]
struct Sequence(AtomicI64);

impl Sequence {
    fn next(&self) -> i64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[derive(Debug)]
struct Tables {
    config: MemoryStoreConfig,
    accounts: DashMap<AccountId, Account>,
    row_locks: DashMap<AccountId, Arc<Mutex<()>>>,
    entries: DashMap<EntryId, Entry>,
    transfers: DashMap<TransferId, Transfer>,
    account_ids: Sequence,
    entry_ids: Sequence,
    transfer_ids: Sequence,
    // Commits publish rows to several tables; readers never see half of one.
    visibility: RwLock<()>,
    faults: DashSet<StoreOp>,
}

impl Tables {
    fn check_fault(&self, op: StoreOp) -> Result<(), StoreError> {
        if self.faults.remove(&op).is_some() {
            return Err(StoreError::database(format!("injected fault in {:?}", op)));
        }
        Ok(())
    }

    fn account_exists(&self, id: AccountId) -> bool {
        self.accounts.contains_key(&id)
    }
}

/// Thread-safe in-memory Ledger Store
#[derive(Debug, Clone)]
pub struct MemoryStore {
    tables: Arc<Tables>,
}

impl MemoryStore {
    pub fn new(config: MemoryStoreConfig) -> Self {
        Self {
            tables: Arc::new(Tables {
                config,
                accounts: DashMap::new(),
                row_locks: DashMap::new(),
                entries: DashMap::new(),
                transfers: DashMap::new(),
                account_ids: Sequence::default(),
                entry_ids: Sequence::default(),
                transfer_ids: Sequence::default(),
                visibility: RwLock::new(()),
                faults: DashSet::new(),
            }),
        }
    }

    pub fn config(&self) -> &MemoryStoreConfig {
        &self.tables.config
    }

    /// Make the next call of `op` fail with `StoreError::Database`
    ///
    /// Used to exercise failure paths; the fault fires once.
    pub fn arm_fault(&self, op: StoreOp) {
        self.tables.faults.insert(op);
    }

    /// Number of committed entries
    pub fn entry_count(&self) -> usize {
        let _visible = self.read_gate();
        self.tables.entries.len()
    }

    /// Number of committed transfers
    pub fn transfer_count(&self) -> usize {
        let _visible = self.read_gate();
        self.tables.transfers.len()
    }

    fn read_gate(&self) -> std::sync::RwLockReadGuard<'_, ()> {
        self.tables
            .visibility
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(MemoryStoreConfig::default())
    }
}

fn paginate<T, K: Ord>(mut rows: Vec<T>, page: Page, key: impl Fn(&T) -> K) -> Vec<T> {
    let page = page.normalized();
    rows.sort_by_key(|row| key(row));
    rows.into_iter()
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .collect()
}

#[async_trait]
impl LedgerStore for MemoryStore {
    type Unit = MemoryUnit;

    async fn begin(&self) -> Result<MemoryUnit, StoreError> {
        self.tables.check_fault(StoreOp::Begin)?;
        Ok(MemoryUnit::new(Arc::clone(&self.tables)))
    }

    async fn create_account(&self, params: CreateAccountParams) -> Result<Account, StoreError> {
        if params.balance < 0 {
            return Err(StoreError::check_violation(
                BALANCE_NON_NEGATIVE,
                format!("opening balance {} is negative", params.balance),
            ));
        }

        let account = Account {
            id: self.tables.account_ids.next(),
            owner: params.owner,
            balance: params.balance,
            currency: params.currency,
            created_at: Utc::now(),
        };

        let _publish = self
            .tables
            .visibility
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        // The lock row must exist before the account becomes visible.
        self.tables
            .row_locks
            .insert(account.id, Arc::new(Mutex::new(())));
        self.tables.accounts.insert(account.id, account.clone());

        Ok(account)
    }

    async fn get_account(&self, id: AccountId) -> Result<Account, StoreError> {
        let _visible = self.read_gate();
        self.tables
            .accounts
            .get(&id)
            .map(|account| account.value().clone())
            .ok_or_else(|| StoreError::account_not_found(id))
    }

    async fn list_accounts(&self, page: Page) -> Result<Vec<Account>, StoreError> {
        let rows: Vec<Account> = {
            let _visible = self.read_gate();
            self.tables
                .accounts
                .iter()
                .map(|entry| entry.value().clone())
                .collect()
        };
        Ok(paginate(rows, page, |account| account.id))
    }

    async fn get_entry(&self, id: EntryId) -> Result<Entry, StoreError> {
        let _visible = self.read_gate();
        self.tables
            .entries
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound {
                entity: Entity::Entry,
                id,
            })
    }

    async fn list_entries(
        &self,
        account_id: AccountId,
        page: Page,
    ) -> Result<Vec<Entry>, StoreError> {
        let rows: Vec<Entry> = {
            let _visible = self.read_gate();
            self.tables
                .entries
                .iter()
                .filter(|entry| entry.value().account_id == account_id)
                .map(|entry| entry.value().clone())
                .collect()
        };
        Ok(paginate(rows, page, |entry| entry.id))
    }

    async fn get_transfer(&self, id: TransferId) -> Result<Transfer, StoreError> {
        let _visible = self.read_gate();
        self.tables
            .transfers
            .get(&id)
            .map(|transfer| transfer.value().clone())
            .ok_or(StoreError::NotFound {
                entity: Entity::Transfer,
                id,
            })
    }

    async fn list_transfers(
        &self,
        from_account_id: AccountId,
        to_account_id: AccountId,
        page: Page,
    ) -> Result<Vec<Transfer>, StoreError> {
        let rows: Vec<Transfer> = {
            let _visible = self.read_gate();
            self.tables
                .transfers
                .iter()
                .filter(|transfer| {
                    transfer.value().from_account_id == from_account_id
                        || transfer.value().to_account_id == to_account_id
                })
                .map(|transfer| transfer.value().clone())
                .collect()
        };
        Ok(paginate(rows, page, |transfer| transfer.id))
    }
}

/// Atomic unit over a `MemoryStore`
///
/// Holds the row locks it has taken, working copies of the locked accounts
/// and the rows it has inserted. Nothing reaches the shared tables before
/// `commit`.
#[derive(Debug)]
pub struct MemoryUnit {
    tables: Arc<Tables>,
    row_guards: HashMap<AccountId, OwnedMutexGuard<()>>,
    accounts: HashMap<AccountId, Account>,
    entries: Vec<Entry>,
    transfers: Vec<Transfer>,
}

impl MemoryUnit {
    fn new(tables: Arc<Tables>) -> Self {
        Self {
            tables,
            row_guards: HashMap::new(),
            accounts: HashMap::new(),
            entries: Vec::new(),
            transfers: Vec::new(),
        }
    }

    /// Take the row lock of an account (once per unit) and return its working copy
    async fn lock_row(&mut self, account_id: AccountId) -> Result<&mut Account, StoreError> {
        if !self.row_guards.contains_key(&account_id) {
            let lock = self
                .tables
                .row_locks
                .get(&account_id)
                .map(|lock| Arc::clone(lock.value()))
                .ok_or_else(|| StoreError::account_not_found(account_id))?;

            let timeout = self.tables.config.lock_timeout;
            let guard = match tokio::time::timeout(timeout, lock.lock_owned()).await {
                Ok(guard) => guard,
                Err(_) => {
                    tracing::debug!(
                        account_id,
                        waited_ms = timeout.as_millis() as u64,
                        "Gave up waiting for row lock"
                    );
                    return Err(StoreError::LockTimeout {
                        resource: format!("account {}", account_id),
                    });
                }
            };

            // Read the committed row only once the lock is ours.
            let committed = self
                .tables
                .accounts
                .get(&account_id)
                .map(|account| account.value().clone())
                .ok_or_else(|| StoreError::account_not_found(account_id))?;

            self.row_guards.insert(account_id, guard);
            self.accounts.insert(account_id, committed);
        }

        self.accounts
            .get_mut(&account_id)
            .ok_or_else(|| StoreError::account_not_found(account_id))
    }

    fn ensure_account(&self, account_id: AccountId) -> Result<(), StoreError> {
        if self.accounts.contains_key(&account_id) || self.tables.account_exists(account_id) {
            Ok(())
        } else {
            Err(StoreError::account_not_found(account_id))
        }
    }

    /// Number of row locks this unit currently holds
    pub fn locks_held(&self) -> usize {
        self.row_guards.len()
    }
}

#[async_trait]
impl LedgerUnit for MemoryUnit {
    async fn create_transfer(
        &mut self,
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: i64,
    ) -> Result<Transfer, StoreError> {
        self.tables.check_fault(StoreOp::CreateTransfer)?;

        if amount <= 0 {
            return Err(StoreError::check_violation(
                TRANSFER_AMOUNT_POSITIVE,
                format!("transfer amount {} is not positive", amount),
            ));
        }
        self.ensure_account(from_account_id)?;
        self.ensure_account(to_account_id)?;

        let transfer = Transfer {
            id: self.tables.transfer_ids.next(),
            from_account_id,
            to_account_id,
            amount,
            created_at: Utc::now(),
        };
        self.transfers.push(transfer.clone());

        Ok(transfer)
    }

    async fn create_entry(
        &mut self,
        account_id: AccountId,
        amount: i64,
    ) -> Result<Entry, StoreError> {
        self.tables.check_fault(StoreOp::CreateEntry)?;
        self.ensure_account(account_id)?;

        let entry = Entry {
            id: self.tables.entry_ids.next(),
            account_id,
            amount,
            created_at: Utc::now(),
        };
        self.entries.push(entry.clone());

        Ok(entry)
    }

    async fn add_account_balance(
        &mut self,
        account_id: AccountId,
        delta: i64,
    ) -> Result<Account, StoreError> {
        self.tables.check_fault(StoreOp::AddAccountBalance)?;

        let account = self.lock_row(account_id).await?;
        let balance = account.balance.checked_add(delta).ok_or_else(|| {
            StoreError::check_violation(
                BALANCE_RANGE,
                format!("balance of account {} would overflow", account_id),
            )
        })?;
        if balance < 0 {
            return Err(StoreError::check_violation(
                BALANCE_NON_NEGATIVE,
                format!("balance of account {} would become {}", account_id, balance),
            ));
        }

        account.balance = balance;
        Ok(account.clone())
    }

    async fn get_account_for_update(
        &mut self,
        account_id: AccountId,
    ) -> Result<Account, StoreError> {
        let account = self.lock_row(account_id).await?;
        Ok(account.clone())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tables.check_fault(StoreOp::Commit)?;

        let MemoryUnit {
            tables,
            row_guards,
            accounts,
            entries,
            transfers,
        } = self;

        {
            let _publish = tables
                .visibility
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            for (id, account) in accounts {
                tables.accounts.insert(id, account);
            }
            for entry in entries {
                tables.entries.insert(entry.id, entry);
            }
            for transfer in transfers {
                tables.transfers.insert(transfer.id, transfer);
            }
        }

        // Row locks are released only after the new balances are published.
        drop(row_guards);
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tables.check_fault(StoreOp::Rollback)?;
        drop(self);
        Ok(())
    }
}
