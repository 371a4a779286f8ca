//! Types module
//!
//! Contains the ledger's data structures:
//! - `account`: Account rows and account creation parameters
//! - `entry`: Immutable ledger entries
//! - `transfer`: Transfer records, requests and composed results
//! - `error`: Store-boundary and coordinator error types

pub mod account;
pub mod entry;
pub mod error;
pub mod transfer;

pub use account::{is_supported_currency, Account, AccountId, CreateAccountParams};
pub use entry::{Entry, EntryId};
pub use error::{Entity, LedgerError, StoreError, TransferStep};
pub use transfer::{Transfer, TransferId, TransferParams, TransferResult};
