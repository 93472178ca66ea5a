//! # AppError
//!
//! Centralized error handling for Pinboard.
//! Gateway adapters map their library failures into these variants at the
//! boundary so the store can reason about them.

use thiserror::Error;

/// The primary error type for all pb-core operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Resource not found (e.g., Board, Image, link)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Validation failure (e.g., empty board name, unsupported file type)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Resource already exists (e.g., image already saved to the board)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure (e.g., DB down, disk full)
    #[error("internal service error: {0}")]
    Internal(String),

    /// The gateway did not answer in time
    #[error("timed out: {0}")]
    Timeout(String),
}

impl AppError {
    pub fn not_found(entity: &str, id: impl Into<String>) -> Self {
        Self::NotFound(entity.to_string(), id.into())
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(..))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// A specialized Result type for Pinboard logic.
pub type Result<T> = std::result::Result<T, AppError>;
