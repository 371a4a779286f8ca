//! Asynchronous concurrent processing strategy
//!
//! Runs many transfers at once against the shared store, the way concurrent
//! callers of the coordinator would.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent)
//!     ├── AsyncReader (batch CSV reading)
//!     └── TransferCoordinator (one tokio task per transfer)
//!         └── LedgerStore (row locks serialize conflicting transfers)
//! ```
//!
//! # Concurrency
//!
//! - Batches are read one after another; a batch is fully joined before the
//!   next one is read, so memory stays bounded by `batch_size`
//! - Within a batch every transfer is its own task; a semaphore caps the
//!   number in flight at `max_concurrent`
//! - Transfers sharing an account are serialized by the store's row locks in
//!   a fixed order, so they cannot deadlock. Their commit order is not
//!   defined, only the summed result

use crate::core::{LedgerStore, TransferCoordinator};
use crate::io::async_reader::AsyncReader;
use crate::store::{MemoryStore, PgStore};
use crate::strategy::{
    report_accounts, seed_accounts, ProcessingStrategy, RunInput, RunSummary, StoreBackend,
};
use futures::future::join_all;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Configuration for concurrent processing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of transfer requests read per batch
    pub batch_size: usize,
    /// Maximum number of transfers in flight at once
    pub max_concurrent: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig, falling back to defaults for zero values
    pub fn new(batch_size: usize, max_concurrent: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            tracing::warn!(
                default = default.batch_size,
                "Invalid batch_size (0), using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent = if max_concurrent == 0 {
            tracing::warn!(
                default = default.max_concurrent,
                "Invalid max_concurrent (0), using default"
            );
            default.max_concurrent
        } else {
            max_concurrent
        };

        Self {
            batch_size,
            max_concurrent,
        }
    }
}

/// Asynchronous concurrent processing strategy
///
/// # Thread Safety
///
/// AsyncProcessingStrategy is Send + Sync. Tasks share the coordinator by
/// cloning it, which only clones the `Arc` around the store.
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
    backend: StoreBackend,
}

impl AsyncProcessingStrategy {
    /// Create a new AsyncProcessingStrategy
    ///
    /// # Arguments
    ///
    /// * `config` - BatchConfig with batch_size and max_concurrent
    /// * `backend` - Ledger Store to run against
    pub fn new(config: BatchConfig, backend: StoreBackend) -> Self {
        Self { config, backend }
    }

    async fn execute<S: LedgerStore>(
        &self,
        store: Arc<S>,
        input: &RunInput,
        output: &mut dyn Write,
    ) -> Result<RunSummary, String> {
        let file = tokio::fs::File::open(&input.transfers).await.map_err(|e| {
            format!(
                "Failed to open file '{}': {}",
                input.transfers.display(),
                e
            )
        })?;
        // csv-async reads through the futures-io traits
        let mut reader = AsyncReader::new(tokio_util::compat::TokioAsyncReadCompatExt::compat(file));

        let mut touched = seed_accounts(store.as_ref(), input.accounts.as_deref()).await?;
        let coordinator = TransferCoordinator::new(store);
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent));
        let mut summary = RunSummary::default();

        loop {
            let batch = reader.read_batch(self.config.batch_size).await;
            if batch.is_empty() {
                break;
            }

            let mut handles = Vec::with_capacity(batch.len());
            for params in batch {
                touched.insert(params.from_account_id);
                touched.insert(params.to_account_id);

                let permit = Arc::clone(&semaphore)
                    .acquire_owned()
                    .await
                    .map_err(|e| format!("Transfer slots closed: {}", e))?;
                let coordinator = coordinator.clone();
                handles.push(tokio::spawn(async move {
                    let _permit = permit;
                    let outcome = coordinator.transfer(params).await;
                    (params, outcome)
                }));
            }

            // Join barrier: the whole batch settles before the next read
            for joined in join_all(handles).await {
                let (params, outcome) =
                    joined.map_err(|e| format!("Transfer task failed: {}", e))?;
                summary.record(&params, outcome);
            }
        }

        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            max_concurrent = self.config.max_concurrent,
            "Concurrent run finished"
        );

        report_accounts(coordinator.store().as_ref(), &touched, output).await?;
        Ok(summary)
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    fn process(&self, input: &RunInput, output: &mut dyn Write) -> Result<RunSummary, String> {
        let worker_threads = self.config.max_concurrent.clamp(1, num_cpus::get().max(1));
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads)
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
