//! PostgreSQL Ledger Store
//!
//! `PgStore` implements the store traits on a `sqlx::PgPool`. Each atomic
//! unit wraps one database transaction; row locking and isolation come from
//! the database itself. The expected schema is `db/schema.sql`.

use crate::core::traits::{LedgerStore, LedgerUnit, Page};
use crate::types::{
    Account, AccountId, CreateAccountParams, Entity, Entry, EntryId, StoreError, Transfer,
    TransferId,
};
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::time::Duration;

const ACCOUNT_COLUMNS: &str = "id, owner, balance, currency, created_at";
const ENTRY_COLUMNS: &str = "id, account_id, amount, created_at";
const TRANSFER_COLUMNS: &str = "id, from_account_id, to_account_id, amount, created_at";

/// Connection settings for the PostgreSQL store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgStoreConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl PgStoreConfig {
    pub fn new(database_url: impl Into<String>, max_connections: u32) -> Self {
        let max_connections = if max_connections == 0 {
            tracing::warn!("Invalid max_connections (0), using default (10)");
            10
        } else {
            max_connections
        };

        Self {
            database_url: database_url.into(),
            max_connections,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// Ledger Store backed by PostgreSQL
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect a new pool
    pub async fn connect(config: &PgStoreConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.database_url)
            .await?;

        tracing::info!(
            max_connections = config.max_connections,
            "Connected to PostgreSQL ledger store"
        );

        Ok(Self { pool })
    }

    /// Use an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn account_from_row(row: &PgRow) -> Result<Account, StoreError> {
    Ok(Account {
        id: row.try_get("id")?,
        owner: row.try_get("owner")?,
        balance: row.try_get("balance")?,
        currency: row.try_get("currency")?,
        created_at: row.try_get("created_at")?,
    })
}

fn entry_from_row(row: &PgRow) -> Result<Entry, StoreError> {
    Ok(Entry {
        id: row.try_get("id")?,
        account_id: row.try_get("account_id")?,
        amount: row.try_get("amount")?,
        created_at: row.try_get("created_at")?,
    })
}

fn transfer_from_row(row: &PgRow) -> Result<Transfer, StoreError> {
    Ok(Transfer {
        id: row.try_get("id")?,
        from_account_id: row.try_get("from_account_id")?,
        to_account_id: row.try_get("to_account_id")?,
        amount: row.try_get("amount")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Turn a foreign-key violation into NotFound for the referenced account
///
/// `candidates` maps constraint-name fragments to the account id bound to
/// that column; the last candidate is used when the constraint is unnamed.
fn classify_fk(error: sqlx::Error, candidates: &[(&str, AccountId)]) -> StoreError {
    if let Some(db_error) = error.as_database_error() {
        if db_error.code().as_deref() == Some("23503") {
            let constraint = db_error.constraint().unwrap_or_default();
            let id = candidates
                .iter()
                .find(|(fragment, _)| constraint.contains(fragment))
                .or(candidates.last())
                .map(|(_, id)| *id)
                .unwrap_or_default();
            return StoreError::account_not_found(id);
        }
    }
    error.into()
}

fn not_found(entity: Entity, id: i64) -> StoreError {
    StoreError::NotFound { entity, id }
}

#[async_trait]
impl LedgerStore for PgStore {
    type Unit = PgUnit;

    async fn begin(&self) -> Result<PgUnit, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(PgUnit { tx })
    }

    async fn create_account(&self, params: CreateAccountParams) -> Result<Account, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO accounts (owner, balance, currency) VALUES ($1, $2, $3) RETURNING {}",
            ACCOUNT_COLUMNS
        ))
        .bind(&params.owner)
        .bind(params.balance)
        .bind(&params.currency)
        .fetch_one(&self.pool)
        .await?;

        account_from_row(&row)
    }

    async fn get_account(&self, id: AccountId) -> Result<Account, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM accounts WHERE id = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found(Entity::Account, id))?;

        account_from_row(&row)
    }

    async fn list_accounts(&self, page: Page) -> Result<Vec<Account>, StoreError> {
        let page = page.normalized();
        let rows = sqlx::query(&format!(
            "SELECT {} FROM accounts ORDER BY id LIMIT $1 OFFSET $2",
            ACCOUNT_COLUMNS
        ))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(account_from_row).collect()
    }

    async fn get_entry(&self, id: EntryId) -> Result<Entry, StoreError> {
        let row = sqlx::query(&format!("SELECT {} FROM entries WHERE id = $1", ENTRY_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(Entity::Entry, id))?;

        entry_from_row(&row)
    }

    async fn list_entries(
        &self,
        account_id: AccountId,
        page: Page,
    ) -> Result<Vec<Entry>, StoreError> {
        let page = page.normalized();
        let rows = sqlx::query(&format!(
            "SELECT {} FROM entries WHERE account_id = $1 ORDER BY id LIMIT $2 OFFSET $3",
            ENTRY_COLUMNS
        ))
        .bind(account_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(entry_from_row).collect()
    }

    async fn get_transfer(&self, id: TransferId) -> Result<Transfer, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM transfers WHERE id = $1",
            TRANSFER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found(Entity::Transfer, id))?;

        transfer_from_row(&row)
    }

    async fn list_transfers(
        &self,
        from_account_id: AccountId,
        to_account_id: AccountId,
        page: Page,
    ) -> Result<Vec<Transfer>, StoreError> {
        let page = page.normalized();
        let rows = sqlx::query(&format!(
            "SELECT {} FROM transfers \
             WHERE from_account_id = $1 OR to_account_id = $2 \
             ORDER BY id LIMIT $3 OFFSET $4",
            TRANSFER_COLUMNS
        ))
        .bind(from_account_id)
        .bind(to_account_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(transfer_from_row).collect()
    }
}

/// Atomic unit backed by a PostgreSQL transaction
///
/// Dropping the unit without committing rolls the transaction back.
pub struct PgUnit {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerUnit for PgUnit {
    async fn create_transfer(
        &mut self,
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: i64,
    ) -> Result<Transfer, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO transfers (from_account_id, to_account_id, amount) \
             VALUES ($1, $2, $3) RETURNING {}",
            TRANSFER_COLUMNS
        ))
        .bind(from_account_id)
        .bind(to_account_id)
        .bind(amount)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            classify_fk(
                e,
                &[("from_account", from_account_id), ("to_account", to_account_id)],
            )
        })?;

        transfer_from_row(&row)
    }

    async fn create_entry(
        &mut self,
        account_id: AccountId,
        amount: i64,
    ) -> Result<Entry, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO entries (account_id, amount) VALUES ($1, $2) RETURNING {}",
            ENTRY_COLUMNS
        ))
        .bind(account_id)
        .bind(amount)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| classify_fk(e, &[("account", account_id)]))?;

        entry_from_row(&row)
    }

    async fn add_account_balance(
        &mut self,
        account_id: AccountId,
        delta: i64,
    ) -> Result<Account, StoreError> {
        // Server-side arithmetic: the UPDATE takes the row lock and reads the
        // latest committed balance under it.
        let row = sqlx::query(&format!(
            "UPDATE accounts SET balance = balance + $1 WHERE id = $2 RETURNING {}",
            ACCOUNT_COLUMNS
        ))
        .bind(delta)
        .bind(account_id)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| StoreError::account_not_found(account_id))?;

        account_from_row(&row)
    }

    async fn get_account_for_update(
        &mut self,
        account_id: AccountId,
    ) -> Result<Account, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM accounts WHERE id = $1 FOR NO KEY UPDATE",
            ACCOUNT_COLUMNS
        ))
        .bind(account_id)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| StoreError::account_not_found(account_id))?;

        account_from_row(&row)
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_zero_connections_falls_back() {
        let config = PgStoreConfig::new("postgres://localhost/bank", 0);
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.database_url, "postgres://localhost/bank");
    }

    #[test]
    fn test_classify_fk_passes_through_other_errors() {
        let error = classify_fk(sqlx::Error::PoolTimedOut, &[("account", 1)]);
        assert!(matches!(error, StoreError::Database { .. }));
    }
}
