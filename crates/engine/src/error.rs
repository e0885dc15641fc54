//! The module contains the errors the engine can return.
//!
//! The errors are:
//!
//! - [`Validation`] malformed input, rejected before touching the database.
//! - [`KeyNotFound`] the entry or the user aggregate does not exist.
//! - [`Conflict`] an entry was modified concurrently; the caller may retry.
//! - [`Consistency`] a ledger write and its aggregate adjustment could not be
//!   kept together. The aggregate must be reconciled.
//!
//!  [`Validation`]: EngineError::Validation
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`Conflict`]: EngineError::Conflict
//!  [`Consistency`]: EngineError::Consistency
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Aggregate of user \"{user_id}\" is out of sync with entry {entry_id}: {reason}")]
    Consistency {
        user_id: String,
        entry_id: Uuid,
        reason: String,
    },
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Returns `true` when retrying the same request can succeed.
    ///
    /// Validation and not-found errors are final; a consistency error needs a
    /// reconciliation, not a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::Database(_))
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (
                Self::Consistency {
                    user_id: ua,
                    entry_id: ea,
                    ..
                },
                Self::Consistency {
                    user_id: ub,
                    entry_id: eb,
                    ..
                },
            ) => ua == ub && ea == eb,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_conflict_and_database_are_retryable() {
        assert!(EngineError::Conflict("x".to_string()).is_retryable());
        assert!(EngineError::Database(DbErr::Custom("down".to_string())).is_retryable());
        assert!(!EngineError::Validation("x".to_string()).is_retryable());
        assert!(!EngineError::KeyNotFound("x".to_string()).is_retryable());
        assert!(
            !EngineError::Consistency {
                user_id: "alice".to_string(),
                entry_id: Uuid::nil(),
                reason: "rollback failed".to_string(),
            }
            .is_retryable()
        );
    }
}
