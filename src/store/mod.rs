//! Ledger Store backends
//!
//! - `memory` - In-memory store with row-level locking (tests, benches, CLI default)
//! - `postgres` - PostgreSQL store on a `sqlx` connection pool

pub mod memory;
pub mod postgres;

pub use memory::{MemoryStore, MemoryStoreConfig, MemoryUnit, StoreOp};
pub use postgres::{PgStore, PgStoreConfig, PgUnit};
