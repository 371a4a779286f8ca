//! Processing strategy module for batch transfer runs
//!
//! This module defines the Strategy pattern for complete transfer runs: seed
//! the accounts, push every transfer request through the coordinator, then
//! report the final account states. The synchronous and concurrent
//! implementations are selected at runtime.

use crate::cli::StrategyType;
use crate::core::traits::LedgerStore;
use crate::io::csv_format::write_accounts_csv;
use crate::io::sync_reader::read_account_seeds;
use crate::store::{MemoryStoreConfig, PgStoreConfig};
use crate::types::{AccountId, LedgerError, StoreError, TransferParams, TransferResult};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Files a run reads from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInput {
    /// Transfer requests (`from,to,amount`)
    pub transfers: PathBuf,
    /// Optional account seeds (`owner,balance,currency`), opened before any transfer
    pub accounts: Option<PathBuf>,
}

/// Outcome counts of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl RunSummary {
    /// Count one coordinator outcome, logging rejections
    pub fn record(&mut self, params: &TransferParams, outcome: Result<TransferResult, LedgerError>) {
        match outcome {
            Ok(result) => {
                self.succeeded += 1;
                tracing::debug!(
                    transfer_id = result.transfer.id,
                    from = params.from_account_id,
                    to = params.to_account_id,
                    amount = params.amount,
                    "Transfer applied"
                );
            }
            Err(e) => {
                self.failed += 1;
                tracing::warn!(
                    from = params.from_account_id,
                    to = params.to_account_id,
                    amount = params.amount,
                    status = e.status_code(),
                    error = %e,
                    "Transfer rejected"
                );
            }
        }
    }
}

/// Ledger Store the run writes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory(MemoryStoreConfig),
    Postgres(PgStoreConfig),
}

impl Default for StoreBackend {
    fn default() -> Self {
        StoreBackend::Memory(MemoryStoreConfig::default())
    }
}

/// Processing strategy trait for complete transfer runs
pub trait ProcessingStrategy: Send + Sync {
    /// Run every transfer in `input` and write the final account states
    ///
    /// # Arguments
    ///
    /// * `input` - transfer requests and optional account seeds
    /// * `output` - writer for the account CSV
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` if the run completed; rejected transfers are counted,
    ///   not fatal
    /// * `Err(String)` if a fatal error occurred (file not found, invalid seed,
    ///   store unreachable, output not writable)
    fn process(&self, input: &RunInput, output: &mut dyn Write) -> Result<RunSummary, String>;
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of processing strategy to create (Sync or Async)
/// * `config` - Optional configuration for concurrent processing (ignored for sync)
/// * `backend` - Ledger Store to run against
///
/// # Returns
///
/// A boxed trait object implementing the ProcessingStrategy trait
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
    backend: StoreBackend,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(backend)),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(config, backend))
        }
    }
}

/// Open every seed account, returning the ids the store assigned
async fn seed_accounts<S: LedgerStore>(
    store: &S,
    accounts: Option<&Path>,
) -> Result<BTreeSet<AccountId>, String> {
    let mut ids = BTreeSet::new();
    let Some(path) = accounts else {
        return Ok(ids);
    };

    for params in read_account_seeds(path)? {
        let owner = params.owner.clone();
        let account = store
            .create_account(params)
            .await
            .map_err(|e| format!("Failed to open account for '{}': {}", owner, e))?;
        ids.insert(account.id);
    }

    tracing::info!(count = ids.len(), "Seeded accounts");
    Ok(ids)
}

/// Write the committed state of every listed account that exists
async fn report_accounts<S: LedgerStore>(
    store: &S,
    ids: &BTreeSet<AccountId>,
    output: &mut dyn Write,
) -> Result<(), String> {
    let mut accounts = Vec::with_capacity(ids.len());
    for id in ids {
        match store.get_account(*id).await {
            Ok(account) => accounts.push(account),
            Err(StoreError::NotFound { .. }) => {}
            Err(e) => return Err(format!("Failed to read account {}: {}", id, e)),
        }
    }

    write_accounts_csv(&accounts, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TransferCoordinator;
    use crate::store::MemoryStore;
    use crate::types::CreateAccountParams;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_run_summary_counts_outcomes() {
        let store = Arc::new(MemoryStore::default());
        let a = store
            .create_account(CreateAccountParams::new("alice", 100, "USD"))
            .await
            .unwrap();
        let b = store
            .create_account(CreateAccountParams::new("bob", 0, "USD"))
            .await
            .unwrap();
        let coordinator = TransferCoordinator::new(store);
        let mut summary = RunSummary::default();

        for params in [
            TransferParams::new(a.id, b.id, 60),
            TransferParams::new(a.id, b.id, 60),
            TransferParams::new(a.id, a.id, 1),
        ] {
            let outcome = coordinator.transfer(params).await;
            summary.record(&params, outcome);
        }

        assert_eq!(
            summary,
            RunSummary {
                succeeded: 1,
                failed: 2
            }
        );
    }

    #[tokio::test]
    async fn test_report_skips_missing_accounts() {
        let store = MemoryStore::default();
        store
            .create_account(CreateAccountParams::new("alice", 100, "USD"))
            .await
            .unwrap();
        let ids: BTreeSet<AccountId> = [1, 42].into_iter().collect();
        let mut output = Vec::new();

        report_accounts(&store, &ids, &mut output).await.unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "id,owner,balance,currency\n1,alice,100,USD\n"
        );
    }

    #[tokio::test]
    async fn test_seed_accounts_without_file() {
        let store = MemoryStore::default();

        let ids = seed_accounts(&store, None).await.unwrap();

        assert!(ids.is_empty());
    }
}
