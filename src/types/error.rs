//! Error types for the ledger
//!
//! Errors are split along the store boundary:
//!
//! - **StoreError**: produced by a Ledger Store backend. Driver-specific
//!   failures are classified here, once, into typed variants.
//! - **LedgerError**: what the transfer coordinator returns to its caller.
//!   It distinguishes bad requests, missing accounts and failed atomic units
//!   so a front end can map them to 400/404/500-class responses.

use super::account::AccountId;
use std::fmt;
use thiserror::Error;

/// Entity kinds held by the Ledger Store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Account,
    Entry,
    Transfer,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Account => f.write_str("account"),
            Entity::Entry => f.write_str("entry"),
            Entity::Transfer => f.write_str("transfer"),
        }
    }
}

/// Error produced at the Ledger Store boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Referenced row does not exist
    #[error("{entity} {id} not found")]
    NotFound {
        entity: Entity,
        id: i64,
    },

    /// A check constraint rejected the write (negative balance, non-positive amount, ...)
    #[error("check constraint '{constraint}' violated: {message}")]
    CheckViolation {
        constraint: String,
        message: String,
    },

    /// Gave up waiting for a row lock
    #[error("timed out waiting for lock on {resource}")]
    LockTimeout {
        resource: String,
    },

    /// The database aborted this unit to break a lock cycle
    #[error("deadlock detected: {message}")]
    Deadlock {
        message: String,
    },

    /// Any other backend failure (connectivity, protocol, injected fault, ...)
    #[error("database error: {message}")]
    Database {
        message: String,
    },
}

impl StoreError {
    /// Create a NotFound error for an account
    pub fn account_not_found(id: AccountId) -> Self {
        StoreError::NotFound {
            entity: Entity::Account,
            id,
        }
    }

    /// Create a CheckViolation error
    pub fn check_violation(constraint: &str, message: impl Into<String>) -> Self {
        StoreError::CheckViolation {
            constraint: constraint.to_string(),
            message: message.into(),
        }
    }

    /// Create a Database error
    pub fn database(message: impl Into<String>) -> Self {
        StoreError::Database {
            message: message.into(),
        }
    }

    /// Lock conflicts that a caller may reasonably retry
    pub fn is_lock_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::LockTimeout { .. } | StoreError::Deadlock { .. }
        )
    }
}

// Conversion from sqlx::Error to StoreError
//
// Cases that need row context (missing rows, foreign keys) are classified by
// the Postgres backend before falling back to this conversion.
impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        if let Some(db_error) = error.as_database_error() {
            let message = db_error.message().to_string();
            match db_error.code().as_deref() {
                Some("23514") => {
                    return StoreError::CheckViolation {
                        constraint: db_error.constraint().unwrap_or("unknown").to_string(),
                        message,
                    }
                }
                Some("40P01") => return StoreError::Deadlock { message },
                Some("55P03") => return StoreError::LockTimeout { resource: message },
                _ => {}
            }
        }

        StoreError::Database {
            message: error.to_string(),
        }
    }
}

/// Step of a transfer's atomic unit, used to say where a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferStep {
    Begin,
    CreateTransfer,
    CreateFromEntry,
    CreateToEntry,
    AdjustFromBalance,
    AdjustToBalance,
    Commit,
}

impl fmt::Display for TransferStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let step = match self {
            TransferStep::Begin => "begin a transaction",
            TransferStep::CreateTransfer => "create the transfer",
            TransferStep::CreateFromEntry => "create the sender entry",
            TransferStep::CreateToEntry => "create the receiver entry",
            TransferStep::AdjustFromBalance => "adjust the sender balance",
            TransferStep::AdjustToBalance => "adjust the receiver balance",
            TransferStep::Commit => "commit",
        };
        f.write_str(step)
    }
}

/// Error returned by the transfer coordinator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Request rejected before any store interaction
    #[error("Invalid argument: {reason}")]
    InvalidArgument {
        reason: String,
    },

    /// A referenced row does not exist; the unit was rolled back
    #[error("{entity} {id} not found (while trying to {step})")]
    NotFound {
        entity: Entity,
        id: i64,
        step: TransferStep,
    },

    /// The atomic unit failed and was rolled back
    ///
    /// If the rollback failed too, both errors are kept.
    #[error(
        "Transaction failed while trying to {step}: {source}{}",
        rollback.as_ref().map(|e| format!(" (rollback also failed: {})", e)).unwrap_or_default()
    )]
    TransactionFailure {
        step: TransferStep,
        source: StoreError,
        rollback: Option<StoreError>,
    },

    /// The caller cancelled the transfer before commit was issued
    #[error("Transfer cancelled before commit")]
    Cancelled,
}

impl LedgerError {
    /// Create an InvalidArgument error
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        LedgerError::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Create a TransactionFailure error
    pub fn transaction_failure(
        step: TransferStep,
        source: StoreError,
        rollback: Option<StoreError>,
    ) -> Self {
        LedgerError::TransactionFailure {
            step,
            source,
            rollback,
        }
    }

    /// Classify a failed step of an atomic unit
    ///
    /// A missing row surfaces as NotFound as long as the rollback went
    /// through; everything else is a TransactionFailure.
    pub fn from_step(step: TransferStep, source: StoreError, rollback: Option<StoreError>) -> Self {
        match (source, rollback) {
            (StoreError::NotFound { entity, id }, None) => LedgerError::NotFound { entity, id, step },
            (source, rollback) => LedgerError::transaction_failure(step, source, rollback),
        }
    }

    /// HTTP status class a front end should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            LedgerError::InvalidArgument { .. } => 400,
            LedgerError::NotFound { .. } => 404,
            LedgerError::TransactionFailure { .. } | LedgerError::Cancelled => 500,
        }
    }

    /// Whether a caller-side retry may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            LedgerError::TransactionFailure { source, .. } => source.is_lock_conflict(),
            _ => false,
        }
    }
}
