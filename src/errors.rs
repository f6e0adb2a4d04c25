//! Unified application error type.
//! All modules (db, core, remote, cli) return AppError to keep the error
//! handling consistent and easy to manage.

use crate::remote::RemoteError;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // ---------------------------
    // IO
    // ---------------------------
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // ---------------------------
    // Local store
    // ---------------------------
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("Database migration error: {0}")]
    Migration(String),

    #[error("Local store is closed")]
    StoreClosed,

    #[error("Write attempted inside a read-only transaction")]
    ReadOnlyTransaction,

    #[error("Corrupt queue record {id}: {reason}")]
    CorruptRecord { id: String, reason: String },

    // ---------------------------
    // Serialization
    // ---------------------------
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ---------------------------
    // Domain rejections
    // ---------------------------
    #[error("Employee {0} already checked in today")]
    AlreadyCheckedIn(String),

    #[error("No open check-in found for today for employee {0}")]
    NoOpenCheckIn(String),

    #[error("Invalid subject key: {0}")]
    InvalidSubject(String),

    #[error("Invalid activity type: {0}")]
    InvalidActivityType(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Rejected by remote service: {0}")]
    Rejected(String),

    // ---------------------------
    // Remote
    // ---------------------------
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    // ---------------------------
    // Config errors
    // ---------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // ---------------------------
    // Generic fallback
    // ---------------------------
    #[error("Internal error: {0}")]
    Other(String),
}

impl AppError {
    /// Business-rule failures: shown to the user as "rejected", never retried.
    pub fn is_domain_rejection(&self) -> bool {
        matches!(
            self,
            AppError::AlreadyCheckedIn(_)
                | AppError::NoOpenCheckIn(_)
                | AppError::InvalidSubject(_)
                | AppError::InvalidActivityType(_)
                | AppError::InvalidInput(_)
                | AppError::Rejected(_)
        )
    }
}

pub type AppResult<T> = Result<T, AppError>;
