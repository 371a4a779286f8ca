//! Core business logic module
//!
//! This module contains the transfer processing components:
//! - `traits` - Ledger Store and atomic unit abstractions
//! - `coordinator` - Atomic transfer orchestration
//! - `lock_order` - Deterministic row-lock acquisition order
//! - `balance` - Atomic balance adjustments
//! - `recorder` - Transfer and entry creation

pub mod balance;
pub mod coordinator;
pub mod lock_order;
pub mod recorder;
pub mod traits;

pub use balance::{adjust_balance, BalanceAdjustment};
pub use coordinator::TransferCoordinator;
pub use lock_order::{acquisition_order, apply_in_lock_order, AdjustmentFailure};
pub use recorder::{record_entry, record_transfer};
pub use traits::{LedgerStore, LedgerUnit, Page};
