//! Errors surfaced by store operations.
//!
//! Backends report failures as `anyhow::Error`; the stores flatten those
//! into a single human-readable message so callers never see transport
//! internals. Validation failures are raised before any backend call.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Input rejected client-side; no request was sent.
    #[error("{0}")]
    Validation(String),
    /// The backend call failed. Carries the backend's message.
    #[error("{0}")]
    Backend(String),
    /// The referenced entity is not in the local cache.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CoreError::Validation(msg.into())
    }

    pub fn backend(err: anyhow::Error) -> Self {
        CoreError::Backend(err.to_string())
    }

    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        CoreError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, CoreError::Validation(_))
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
