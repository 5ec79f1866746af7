//! Engine error taxonomy.
//!
//! Every engine operation returns [`EngineResult`]. The boundary layer maps
//! the four kinds to transport status codes; nothing in the engine retries
//! automatically, and every generation operation is idempotency-guarded so
//! retrying a failed call is always safe.

use thiserror::Error;

/// Errors produced by engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or out-of-range input. Not retryable.
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// The operation contradicts current persisted state (structures already
    /// exist, sets submitted out of order, set added after a decided winner).
    /// The caller decides whether to reset and retry.
    #[error("{0}")]
    Conflict(String),

    /// An event/registration/group/match/set id did not resolve.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Persistence failure. The enclosing transaction rolls back; no partial
    /// structures are left behind.
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl EngineError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict(reason.into())
    }

    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
