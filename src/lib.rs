//! Simple Bank Ledger Library
//! # Overview
//!
//! This library moves funds between two accounts as one atomic operation and
//! supports many such transfers running concurrently against a shared store.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Account, Entry, Transfer, errors)
//! - [`core`] - Business logic components:
//!   - [`core::coordinator`] - Atomic transfer orchestration
//!   - [`core::lock_order`] - Deadlock-free row lock ordering
//!   - [`core::balance`] - Atomic balance adjustments
//!   - [`core::recorder`] - Transfer and entry creation
//! - [`store`] - Ledger Store backends (in-memory, PostgreSQL)
//! - [`strategy`] - Sequential and concurrent batch transfer runs
//! - [`io`] - CSV input and output
//! - [`cli`] - CLI arguments parsing
//! - [`logging`] - Subscriber setup
//!
//! # Transfers
//!
//! A transfer writes, in one atomic unit:
//!
//! - **Transfer**: the record of the movement
//! - **Debit entry**: `-amount` against the sender
//! - **Credit entry**: `+amount` against the receiver
//! - **Balance updates**: both accounts, locked smallest id first
//!
//! Either all of it becomes visible at commit or none of it does.
//!
//! ```no_run
//! use simple_bank::{CreateAccountParams, LedgerStore, MemoryStore, TransferCoordinator, TransferParams};
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::default());
//! let alice = store.create_account(CreateAccountParams::new("alice", 1000, "USD")).await?;
//! let bob = store.create_account(CreateAccountParams::new("bob", 500, "USD")).await?;
//!
//! let coordinator = TransferCoordinator::new(store);
//! let result = coordinator.transfer(TransferParams::new(alice.id, bob.id, 200)).await?;
//! assert_eq!(result.from_account.balance, 800);
//! assert_eq!(result.to_account.balance, 700);
//! # Ok(())
//! # }
//! ```

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod logging;
pub mod store;
pub mod strategy;
pub mod types;

pub use core::{LedgerStore, LedgerUnit, Page, TransferCoordinator};
pub use io::write_accounts_csv;
pub use store::{MemoryStore, MemoryStoreConfig, PgStore, PgStoreConfig};
pub use types::{
    Account, AccountId, CreateAccountParams, Entry, EntryId, LedgerError, StoreError, Transfer,
    TransferId, TransferParams, TransferResult, TransferStep,
};
