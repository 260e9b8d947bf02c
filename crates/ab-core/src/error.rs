//! # AppError
//!
//! Centralized error handling for the board.
//! A wrong delete password is not an error; see [`crate::ModerationOutcome`].

use crate::document::Kind;
use thiserror::Error;

/// The primary error type for all ab-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Board, Thread)
    #[error("{0} not found: {1}")]
    NotFound(Kind, String),

    /// Validation failure (e.g., empty text, overlong board name)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// A stored document no longer decodes into its model
    #[error("corrupt {kind} document: {source}")]
    Corrupt {
        kind: Kind,
        #[source]
        source: serde_json::Error,
    },

    /// Infrastructure failure (e.g., DB down, lock poisoned)
    #[error("storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(kind: Kind, key: impl ToString) -> Self {
        AppError::NotFound(kind, key.to_string())
    }
}

/// A specialized Result type for board logic.
pub type Result<T> = std::result::Result<T, AppError>;
