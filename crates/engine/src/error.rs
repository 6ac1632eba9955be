//! Errors the engine can raise.
//!
//! The taxonomy is deliberately small:
//!
//! - [`NotFound`]: a referenced entity does not exist or is not owned by the
//!   caller. Never retried; surfaced verbatim.
//! - [`InvalidOperation`]: the request itself is wrong for the current state
//!   (repayment on an institutional debt, early payment on or after the due
//!   date, settlement exceeding the pending total, empty pool). Client error,
//!   not retried.
//! - [`InvalidAmount`]: a monetary string or range failed validation.
//! - [`Conflict`]: the entity already exists. Duplicate catch-up applications
//!   never reach this variant; the `(debt_id, update_date)` existence check
//!   turns them into no-ops by construction.
//!
//!  [`NotFound`]: EngineError::NotFound
//!  [`InvalidOperation`]: EngineError::InvalidOperation
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`Conflict`]: EngineError::Conflict
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" not found")]
    NotFound(String),
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("\"{0}\" already present")]
    Conflict(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::InvalidOperation(a), Self::InvalidOperation(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
