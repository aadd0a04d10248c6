//! # AppError
//!
//! Centralized error handling for the Bookery ecosystem.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all bk-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found or soft-deleted (e.g., Book, Comment, Profile)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Validation failure (e.g., stars out of range, empty review body)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Security/Auth failure (e.g., bad credentials, disabled account, non-moderator)
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Uniqueness or state-machine violation (e.g., duplicate review for a book)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Persistence layer unreachable; retriable
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Infrastructure failure (e.g., broken referential link, serialization)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status the transport layer reports for this error kind.
    pub fn status(&self) -> u16 {
        match self {
            AppError::ValidationError(_) => 400,
            AppError::Unauthorized(_) => 401,
            AppError::NotFound(_, _) => 404,
            AppError::Conflict(_) => 409,
            AppError::ServiceUnavailable(_) => 503,
            AppError::Internal(_) => 500,
        }
    }

    /// Shorthand for the common "entity id did not resolve" case.
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        AppError::NotFound(entity.to_string(), id.to_string())
    }
}

/// A specialized Result type for Bookery logic.
pub type Result<T> = std::result::Result<T, AppError>;
