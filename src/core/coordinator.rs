//! Transfer coordinator
//!
//! Moves funds between two accounts as one atomic unit of work against the
//! injected Ledger Store.
//!
//! # Design
//!
//! Within a single unit the coordinator:
//! 1. records the transfer row
//! 2. records the debit entry (`-amount`) for the sender
//! 3. records the credit entry (`+amount`) for the receiver
//! 4. applies both balance deltas through the lock-order policy
//!
//! If every step succeeds the unit is committed and the aggregated
//! [`TransferResult`] returned. Any failure rolls the whole unit back and is
//! returned once, tagged with the step that failed. No retries happen here.
//!
//! Sufficient funds are not pre-checked: the store's non-negative balance
//! constraint rejects an overdraft at the sender adjustment.
//!
//! # Thread Safety
//!
//! The coordinator only holds an `Arc` to the store, so it is cheap to clone
//! and can be shared by any number of concurrent tasks. Isolation between
//! transfers is the store's row locking, taken in a fixed global order.

use crate::core::balance::BalanceAdjustment;
use crate::core::lock_order::{apply_in_lock_order, AdjustmentFailure};
use crate::core::recorder::{record_entry, record_transfer};
use crate::core::traits::{LedgerStore, LedgerUnit};
use crate::types::{LedgerError, StoreError, TransferParams, TransferResult, TransferStep};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Coordinates atomic transfers against a Ledger Store
pub struct TransferCoordinator<S: LedgerStore> {
    store: Arc<S>,
}

impl<S: LedgerStore> Clone for TransferCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: LedgerStore> TransferCoordinator<S> {
    /// Create a coordinator over a process-owned store handle
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The store this coordinator writes to
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Transfer `amount` from one account to another
    ///
    /// # Arguments
    ///
    /// * `params` - sender, receiver and a positive amount
    ///
    /// # Returns
    ///
    /// * `Ok(TransferResult)` - the committed transfer, both entries and both
    ///   post-update accounts
    /// * `Err(LedgerError::InvalidArgument)` - rejected before touching the store
    /// * `Err(LedgerError::NotFound)` - an account does not exist; nothing persisted
    /// * `Err(LedgerError::TransactionFailure)` - any other store failure; nothing persisted
    pub async fn transfer(&self, params: TransferParams) -> Result<TransferResult, LedgerError> {
        self.transfer_with_cancel(params, &CancellationToken::new())
            .await
    }

    /// Same as [`TransferCoordinator::transfer`], abandoning the unit if
    /// `cancel` fires before commit is issued
    ///
    /// A cancelled transfer is rolled back and reported as
    /// `LedgerError::Cancelled`. Once commit has been issued the token is no
    /// longer observed, so a transfer never ends up half committed.
    #[tracing::instrument(
        name = "transfer",
        skip(self, params, cancel),
        fields(
            from = params.from_account_id,
            to = params.to_account_id,
            amount = params.amount
        )
    )]
    pub async fn transfer_with_cancel(
        &self,
        params: TransferParams,
        cancel: &CancellationToken,
    ) -> Result<TransferResult, LedgerError> {
        params.validate()?;

        if cancel.is_cancelled() {
            return Err(LedgerError::Cancelled);
        }

        let mut unit = self
            .store
            .begin()
            .await
            .map_err(|e| LedgerError::transaction_failure(TransferStep::Begin, e, None))?;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            outcome = execute(&mut unit, &params) => Some(outcome),
        };

        match outcome {
            None => {
                if let Err(e) = unit.rollback().await {
                    tracing::error!(error = %e, "Rollback of cancelled transfer failed");
                }
                tracing::debug!("Transfer cancelled, unit rolled back");
                Err(LedgerError::Cancelled)
            }
            Some(Err((step, source))) => {
                let rollback = unit.rollback().await.err();
                tracing::warn!(
                    %step,
                    error = %source,
                    rollback_failed = rollback.is_some(),
                    "Transfer rolled back"
                );
                Err(LedgerError::from_step(step, source, rollback))
            }
            Some(Ok(result)) => {
                unit.commit()
                    .await
                    .map_err(|e| LedgerError::transaction_failure(TransferStep::Commit, e, None))?;
                tracing::debug!(transfer_id = result.transfer.id, "Transfer committed");
                Ok(result)
            }
        }
    }
}

/// Every step of a transfer inside one unit
async fn execute<U: LedgerUnit>(
    unit: &mut U,
    params: &TransferParams,
) -> Result<TransferResult, (TransferStep, StoreError)> {
    let transfer = record_transfer(unit, params)
        .await
        .map_err(|e| (TransferStep::CreateTransfer, e))?;

    let from_entry = record_entry(unit, params.from_account_id, -params.amount)
        .await
        .map_err(|e| (TransferStep::CreateFromEntry, e))?;

    let to_entry = record_entry(unit, params.to_account_id, params.amount)
        .await
        .map_err(|e| (TransferStep::CreateToEntry, e))?;

    let [from_account, to_account] = apply_in_lock_order(
        unit,
        [
            BalanceAdjustment::debit(params.from_account_id, params.amount),
            BalanceAdjustment::credit(params.to_account_id, params.amount),
        ],
    )
    .await
    .map_err(|AdjustmentFailure { index, source }| {
        let step = if index == 0 {
            TransferStep::AdjustFromBalance
        } else {
            TransferStep::AdjustToBalance
        };
        (step, source)
    })?;

    Ok(TransferResult {
        transfer,
        from_entry,
        to_entry,
        from_account,
        to_account,
    })
}
