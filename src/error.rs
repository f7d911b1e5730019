//! Service error taxonomy
//!
//! Every error that can cross the HTTP boundary is a `ServiceError` variant.
//! Single-attempt provider failures are typed separately
//! (`llm::ProviderError`): the orchestrator catches them and either
//! transitions to the fallback attempt or collapses them into `Exhausted`.
//! Database errors never leak their text to clients.

use thiserror::Error;

/// Result type for service operations
pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing or empty required field (400)
    #[error("{0}")]
    Validation(String),

    /// Per-identity session cap reached (403)
    #[error("Maximum number of active sessions reached")]
    CapacityExceeded,

    /// Admin login with wrong credentials (401)
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Missing, unknown, or expired bearer token (401)
    #[error("Unauthorized — admin login required")]
    Unauthorized,

    /// Referenced entity does not exist (404)
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Both the primary and fallback attempts failed (500, generic to client)
    #[error("All reply providers exhausted")]
    Exhausted,

    /// Unexpected store error (500, generic to client)
    #[error("Database error")]
    Database(#[from] sqlx::Error),
}
