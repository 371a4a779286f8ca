//! Synchronous processing strategy
//!
//! Applies transfers one at a time, in file order, on a current-thread
//! runtime.
//!
//! # Design
//!
//! The SyncProcessingStrategy focuses on orchestration, delegating:
//! - CSV parsing to `SyncReader` (iterator interface)
//! - Transfers to `TransferCoordinator`
//! - CSV output to `csv_format::write_accounts_csv` (format handling)
//!
//! Transfer requests are streamed, so memory use grows with the number of
//! accounts touched, not with the number of transfers.

use crate::core::{LedgerStore, TransferCoordinator};
use crate::io::sync_reader::SyncReader;
use crate::store::{MemoryStore, PgStore};
use crate::strategy::{
    report_accounts, seed_accounts, ProcessingStrategy, RunInput, RunSummary, StoreBackend,
};
use std::io::Write;
use std::sync::Arc;

/// Synchronous processing strategy
///
/// # Examples
///
/// ```no_run
/// use simple_bank::strategy::{ProcessingStrategy, RunInput, StoreBackend, SyncProcessingStrategy};
/// use std::path::PathBuf;
///
/// let strategy = SyncProcessingStrategy::new(StoreBackend::default());
/// let input = RunInput {
///     transfers: PathBuf::from("transfers.csv"),
///     accounts: Some(PathBuf::from("accounts.csv")),
/// };
///
/// let summary = strategy
///     .process(&input, &mut std::io::stdout())
///     .expect("Processing failed");
/// eprintln!("{} applied, {} rejected", summary.succeeded, summary.failed);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SyncProcessingStrategy {
    backend: StoreBackend,
}

impl SyncProcessingStrategy {
    pub fn new(backend: StoreBackend) -> Self {
        Self { backend }
    }

    async fn execute<S: LedgerStore>(
        &self,
        store: Arc<S>,
        input: &RunInput,
        output: &mut dyn Write,
    ) -> Result<RunSummary, String> {
        let reader = SyncReader::new(&input.transfers)?;
        let mut touched = seed_accounts(store.as_ref(), input.accounts.as_deref()).await?;
        let coordinator = TransferCoordinator::new(store);
        let mut summary = RunSummary::default();

        for row in reader {
            match row {
                Ok(params) => {
                    touched.insert(params.from_account_id);
                    touched.insert(params.to_account_id);
                    let outcome = coordinator.transfer(params).await;
                    summary.record(&params, outcome);
                }
                Err(e) => tracing::warn!(error = %e, "Skipping malformed transfer row"),
            }
        }

        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Sequential run finished"
        );

        report_accounts(coordinator.store().as_ref(), &touched, output).await?;
        Ok(summary)
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(&self, input: &RunInput, output: &mut dyn Write) -> Result<RunSummary, String> {
        // Timers drive the in-memory lock timeout, IO drives the Postgres pool
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        runtime.block_on(async {
            match &self.backend {
                StoreBackend::Memory(config) => {
                    let store = Arc::new(MemoryStore::new(config.clone()));
                    self.execute(store, input, output).await
                }
                StoreBackend::Postgres(config) => {
                    let store = PgStore::connect(config)
                        .await
                        .map_err(|e| format!("Failed to connect to the ledger store: {}", e))?;
                    self.execute(Arc::new(store), input, output).await
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use tempfile::NamedTempFile;

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn input(transfers: &Path, accounts: &Path) -> RunInput {
        RunInput {
            transfers: transfers.to_path_buf(),
            accounts: Some(accounts.to_path_buf()),
        }
    }

    #[test]
    fn test_sync_strategy_applies_transfers_in_order() {
        let accounts = create_temp_csv("owner,balance,currency\nalice,1000,USD\nbob,500,USD\n");
        // The second transfer only succeeds after the first one
        let transfers = create_temp_csv("from,to,amount\n1,2,200\n2,1,700\n");
        let mut output = Vec::new();

        let summary = SyncProcessingStrategy::default()
            .process(&input(transfers.path(), accounts.path()), &mut output)
            .unwrap();

        assert_eq!(
            summary,
            RunSummary {
                succeeded: 2,
                failed: 0
            }
        );
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "id,owner,balance,currency\n1,alice,1500,USD\n2,bob,0,USD\n"
        );
    }

    #[test]
    fn test_sync_strategy_counts_rejections_and_continues() {
        let accounts = create_temp_csv("owner,balance,currency\nalice,100,USD\nbob,0,USD\n");
        let transfers =
            create_temp_csv("from,to,amount\n1,2,500\n1,1,5\n1,3,5\n1,2,0\n1,2,oops\n1,2,40\n");
        let mut output = Vec::new();

        let summary = SyncProcessingStrategy::default()
            .process(&input(transfers.path(), accounts.path()), &mut output)
            .unwrap();

        assert_eq!(
            summary,
            RunSummary {
                succeeded: 1,
                failed: 4
            }
        );
        // Account 3 was referenced but never existed
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "id,owner,balance,currency\n1,alice,60,USD\n2,bob,40,USD\n"
        );
    }

    #[test]
    fn test_sync_strategy_missing_transfers_file() {
        let strategy = SyncProcessingStrategy::default();
        let input = RunInput {
            transfers: PathBuf::from("/nonexistent/transfers.csv"),
            accounts: None,
        };
        let mut output = Vec::new();

        let result = strategy.process(&input, &mut output);

        assert!(result.unwrap_err().contains("Failed to open file"));
        assert!(output.is_empty());
    }

    #[test]
    fn test_sync_strategy_invalid_seed_is_fatal() {
        let accounts = create_temp_csv("owner,balance,currency\nalice,100,ABC\n");
        let transfers = create_temp_csv("from,to,amount\n");
        let mut output = Vec::new();

        let result = SyncProcessingStrategy::default()
            .process(&input(transfers.path(), accounts.path()), &mut output);

        assert!(result.unwrap_err().contains("unsupported currency"));
    }
}
