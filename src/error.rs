//! Unified error handling
//!
//! Application-level error taxonomy. The HTTP layer (out of scope here) maps
//! these to status codes: `NotFound` → 404, `Conflict` → 409, `Validation` →
//! 400, `InvalidTransition` → 422, everything else → 500.

/// Application error enum
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing order, table or status (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Table already occupied, or sequence retries exhausted (409)
    #[error("Resource conflict: {0}")]
    Conflict(String),

    /// Bad input: non-positive quantity, unknown status id, ... (400)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Mutation of an order already in a terminal status (422)
    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    /// Persistence failure (500)
    #[error("Database error: {0}")]
    Database(String),

    /// Anything else unexpected (500)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Application-level Result type
pub type AppResult<T> = Result<T, AppError>;

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound("record not found".to_string()),
            other => AppError::Database(other.to_string()),
        }
    }
}
