//! CSV format handling for account seeds, transfer requests and account output
//!
//! This module centralizes all CSV format concerns, providing:
//! - `AccountCsvRecord` (`owner,balance,currency`) for seeding accounts
//! - `TransferCsvRecord` (`from,to,amount`) for transfer requests
//! - Account output serialization (`id,owner,balance,currency`)
//!
//! All functions are pure (no I/O) for easy testing.

use crate::types::{Account, AccountId, CreateAccountParams, TransferParams};
use serde::Deserialize;
use std::io::Write;

/// One account to open before transfers run
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct AccountCsvRecord {
    pub owner: String,
    pub balance: i64,
    pub currency: String,
}

/// One transfer request
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct TransferCsvRecord {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: i64,
}

/// Convert a seed row into validated account creation parameters
///
/// # Returns
///
/// * `Ok(CreateAccountParams)` - owner present, balance non-negative, currency supported
/// * `Err(String)` - the validation failure
pub fn convert_account_record(record: AccountCsvRecord) -> Result<CreateAccountParams, String> {
    let params = CreateAccountParams::new(record.owner, record.balance, record.currency);
    params.validate().map_err(|e| e.to_string())?;
    Ok(params)
}

/// Convert a transfer row into transfer parameters
///
/// Amount and account checks are left to the coordinator so a bad request is
/// counted as a rejected transfer rather than a malformed row.
pub fn convert_transfer_record(record: TransferCsvRecord) -> TransferParams {
    TransferParams::new(record.from, record.to, record.amount)
}

/// Write account states to CSV format
///
/// Writes accounts with columns: id, owner, balance, currency.
/// Accounts are sorted by id for deterministic output.
///
/// # Arguments
///
/// * `accounts` - Slice of accounts to write
/// * `output` - Mutable reference to a writer for outputting CSV
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if a write error occurred
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["id", "owner", "balance", "currency"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted_accounts: Vec<&Account> = accounts.iter().collect();
    sorted_accounts.sort_by_key(|account| account.id);

    for account in sorted_accounts {
        writer
            .write_record(&[
                account.id.to_string(),
                account.owner.clone(),
                account.balance.to_string(),
                account.currency.clone(),
            ])
            .map_err(|e| format!("Failed to write account record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}
