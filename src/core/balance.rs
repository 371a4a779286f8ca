//! Balance mutator
//!
//! A balance adjustment is a signed delta applied to one account through the
//! store's atomic add, inside the caller's unit. The store evaluates the
//! arithmetic under the account's row lock, so concurrent adjustments to the
//! same account never lose an update.

use crate::core::traits::LedgerUnit;
use crate::types::{Account, AccountId, StoreError};

/// Signed delta to apply to one account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceAdjustment {
    pub account_id: AccountId,
    pub delta: i64,
}

impl BalanceAdjustment {
    pub fn new(account_id: AccountId, delta: i64) -> Self {
        Self { account_id, delta }
    }

    /// Debit of `amount` on `account_id`
    pub fn debit(account_id: AccountId, amount: i64) -> Self {
        Self::new(account_id, -amount)
    }

    /// Credit of `amount` on `account_id`
    pub fn credit(account_id: AccountId, amount: i64) -> Self {
        Self::new(account_id, amount)
    }
}

/// Apply one adjustment and return the account as it is after the delta
///
/// # Returns
///
/// * `Ok(Account)` - the post-update snapshot, as seen by this unit
/// * `Err(StoreError::NotFound)` - if the account does not exist
/// * `Err(StoreError)` - any other store failure (constraint, lock timeout, ...)
pub async fn adjust_balance<U: LedgerUnit>(
    unit: &mut U,
    adjustment: BalanceAdjustment,
) -> Result<Account, StoreError> {
    let account = unit
        .add_account_balance(adjustment.account_id, adjustment.delta)
        .await?;

    tracing::trace!(
        account_id = adjustment.account_id,
        delta = adjustment.delta,
        balance = account.balance,
        "Adjusted balance"
    );

    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::LedgerStore;
    use crate::store::MemoryStore;
    use crate::types::CreateAccountParams;

    #[test]
    fn test_debit_and_credit_signs() {
        assert_eq!(BalanceAdjustment::debit(1, 200).delta, -200);
        assert_eq!(BalanceAdjustment::credit(2, 200).delta, 200);
    }

    #[tokio::test]
    async fn test_adjust_balance_returns_updated_account() {
        let store = MemoryStore::default();
        let account = store
            .create_account(CreateAccountParams::new("alice", 1000, "USD"))
            .await
            .unwrap();

        let mut unit = store.begin().await.unwrap();
        let updated = adjust_balance(&mut unit, BalanceAdjustment::debit(account.id, 200))
            .await
            .unwrap();

        assert_eq!(updated.id, account.id);
        assert_eq!(updated.balance, 800);
    }

    #[tokio::test]
    async fn test_adjust_balance_missing_account() {
        let store = MemoryStore::default();

        let mut unit = store.begin().await.unwrap();
        let result = adjust_balance(&mut unit, BalanceAdjustment::credit(12, 1)).await;

        assert_eq!(result.unwrap_err(), StoreError::account_not_found(12));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adjustments_lose_no_update() {
        use std::sync::Arc;

        let store = Arc::new(MemoryStore::default());
        let account = store
            .create_account(CreateAccountParams::new("alice", 0, "USD"))
            .await
            .unwrap();

        let mut handles = vec![];
        for _ in 0..50 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let mut unit = store.begin().await.unwrap();
                adjust_balance(&mut unit, BalanceAdjustment::credit(account.id, 10))
                    .await
                    .unwrap();
                unit.commit().await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let account = store.get_account(account.id).await.unwrap();
        assert_eq!(account.balance, 500);
    }
}
