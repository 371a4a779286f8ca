//! Lock-order policy
//!
//! Two transfers between the same pair of accounts in opposite directions
//! would, if each touched its source first, take the two row locks in
//! opposite orders and deadlock. The policy fixes the order by account id
//! (smaller id first) whatever the transfer direction, so every unit that
//! touches {A, B} locks them in the same global order.
//!
//! The policy only changes *when* each row is touched. Which account gets
//! which delta is left as requested.

use crate::core::balance::{adjust_balance, BalanceAdjustment};
use crate::core::traits::LedgerUnit;
use crate::types::{Account, StoreError};

/// An adjustment of the pair failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustmentFailure {
    /// Position of the failed adjustment in the pair as passed in
    pub index: usize,
    pub source: StoreError,
}

/// Positions of `pair` in the order their row locks must be taken
///
/// Equal ids keep their input order.
pub fn acquisition_order(pair: &[BalanceAdjustment; 2]) -> [usize; 2] {
    if pair[1].account_id < pair[0].account_id {
        [1, 0]
    } else {
        [0, 1]
    }
}

/// Apply both adjustments in lock order
///
/// # Returns
///
/// * `Ok([Account; 2])` - post-update accounts, in the same positions as `pair`
/// * `Err(AdjustmentFailure)` - the first failing adjustment and its position
///   in `pair`; the second adjustment is not attempted
pub async fn apply_in_lock_order<U: LedgerUnit>(
    unit: &mut U,
    pair: [BalanceAdjustment; 2],
) -> Result<[Account; 2], AdjustmentFailure> {
    let [first, second] = acquisition_order(&pair);

    let first_account = adjust_balance(unit, pair[first])
        .await
        .map_err(|source| AdjustmentFailure {
            index: first,
            source,
        })?;
    let second_account = adjust_balance(unit, pair[second])
        .await
        .map_err(|source| AdjustmentFailure {
            index: second,
            source,
        })?;

    if first == 0 {
        Ok([first_account, second_account])
    } else {
        Ok([second_account, first_account])
    }
}
