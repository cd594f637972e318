//! The module contains the error the engine can throw.
//!
//! Errors fall in three families, see [`ErrorKind`]:
//!
//! - validation errors such as [`MissingAmount`] and [`InsufficientFunds`]
//!   are user-correctable and reported back to the caller;
//! - configuration errors such as [`NoMatchingBundle`] are fatal for the
//!   operation, the ledger never proceeds with a stale fee tier;
//! - storage errors wrap the database layer.
//!
//! Every error aborts the enclosing database transaction, so no partial
//! ledger mutation survives.
//!
//!  [`MissingAmount`]: EngineError::MissingAmount
//!  [`InsufficientFunds`]: EngineError::InsufficientFunds
//!  [`NoMatchingBundle`]: EngineError::NoMatchingBundle
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Missing amount: {0}")]
    MissingAmount(String),
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid rate: {0}")]
    InvalidRate(String),
    #[error("Already applied: {0}")]
    AlreadyApplied(String),
    #[error("Out of order: {0}")]
    OutOfOrder(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("No bundle matches wallet value {0}")]
    NoMatchingBundle(String),
    #[error("Invalid bundle configuration: {0}")]
    InvalidBundle(String),
    #[error("Invalid stored value: {0}")]
    InvalidStoredValue(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

/// Coarse classification of [`EngineError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Configuration,
    Storage,
}

impl EngineError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingAmount(_)
            | Self::InsufficientFunds(_)
            | Self::InvalidAmount(_)
            | Self::InvalidRate(_)
            | Self::AlreadyApplied(_)
            | Self::OutOfOrder(_)
            | Self::KeyNotFound(_)
            | Self::ExistingKey(_) => ErrorKind::Validation,
            Self::NoMatchingBundle(_) | Self::InvalidBundle(_) => ErrorKind::Configuration,
            Self::InvalidStoredValue(_) | Self::Database(_) => ErrorKind::Storage,
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::MissingAmount(a), Self::MissingAmount(b)) => a == b,
            (Self::InsufficientFunds(a), Self::InsufficientFunds(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidRate(a), Self::InvalidRate(b)) => a == b,
            (Self::AlreadyApplied(a), Self::AlreadyApplied(b)) => a == b,
            (Self::OutOfOrder(a), Self::OutOfOrder(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::NoMatchingBundle(a), Self::NoMatchingBundle(b)) => a == b,
            (Self::InvalidBundle(a), Self::InvalidBundle(b)) => a == b,
            (Self::InvalidStoredValue(a), Self::InvalidStoredValue(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
