//! Transfer recorder
//!
//! Creates the append-only part of a transfer: the transfer row and its two
//! entries. These are pure inserts with no balance side effects, and every
//! call runs inside the caller's unit.

use crate::core::traits::LedgerUnit;
use crate::types::{AccountId, Entry, StoreError, Transfer, TransferParams};

/// Insert the transfer row
pub async fn record_transfer<U: LedgerUnit>(
    unit: &mut U,
    params: &TransferParams,
) -> Result<Transfer, StoreError> {
    let transfer = unit
        .create_transfer(params.from_account_id, params.to_account_id, params.amount)
        .await?;

    tracing::trace!(transfer_id = transfer.id, "Recorded transfer");
    Ok(transfer)
}

/// Insert one entry (negative amount = debit, positive = credit)
pub async fn record_entry<U: LedgerUnit>(
    unit: &mut U,
    account_id: AccountId,
    amount: i64,
) -> Result<Entry, StoreError> {
    let entry = unit.create_entry(account_id, amount).await?;

    tracing::trace!(entry_id = entry.id, account_id, amount, "Recorded entry");
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::LedgerStore;
    use crate::store::MemoryStore;
    use crate::types::CreateAccountParams;

    #[tokio::test]
    async fn test_recorder_writes_only_inside_the_unit() {
        let store = MemoryStore::default();
        let a = store
            .create_account(CreateAccountParams::new("alice", 1000, "USD"))
            .await
            .unwrap();
        let b = store
            .create_account(CreateAccountParams::new("bob", 500, "USD"))
            .await
            .unwrap();
        let params = TransferParams::new(a.id, b.id, 200);

        let mut unit = store.begin().await.unwrap();
        let transfer = record_transfer(&mut unit, &params).await.unwrap();
        let debit = record_entry(&mut unit, a.id, -200).await.unwrap();
        let credit = record_entry(&mut unit, b.id, 200).await.unwrap();

        assert_eq!(transfer.amount, 200);
        assert!(debit.is_debit());
        assert!(credit.is_credit());
        assert_eq!(store.transfer_count(), 0);

        unit.commit().await.unwrap();

        assert_eq!(store.transfer_count(), 1);
        assert_eq!(store.entry_count(), 2);
        // No balance side effects
        assert_eq!(store.get_account(a.id).await.unwrap().balance, 1000);
        assert_eq!(store.get_account(b.id).await.unwrap().balance, 500);
    }
}
