//! Domain-level error types.

use thiserror::Error;

/// Quota errors - every way a gated request can fail to reach a decision.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QuotaError {
    #[error("No quota policy for client {client_id}")]
    PolicyNotFound { client_id: String },

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Invalid policy for client {client_id}: {reason}")]
    InvalidPolicy { client_id: String, reason: String },
}

impl QuotaError {
    pub fn invalid_policy(client_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPolicy {
            client_id: client_id.into(),
            reason: reason.into(),
        }
    }
}

/// Repository-level errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    Query(String),
}

impl From<RepoError> for QuotaError {
    fn from(err: RepoError) -> Self {
        QuotaError::BackendUnavailable(err.to_string())
    }
}
