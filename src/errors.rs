//! Unified error type for the key tracker.
//!
//! Notification failures are not propagated out of the alert engine;
//! they degrade to `sent: false` in the outcome. Everything here is what callers can
//! actually receive as an `Err`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid request: {message}")]
    Validation { message: String },

    #[error("Invalid date '{value}': expected YYYY-MM-DD")]
    InvalidDate { value: String },

    #[error("Employee not found: {name}")]
    EmployeeNotFound { name: String },

    #[error("Notification error: {message}")]
    Notification { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
