use async_trait::async_trait;

use crate::domain::ClientPolicy;
use crate::error::QuotaError;

/// Durable client-id → policy table. Read-only from the gate's point of view.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Look up the policy for `client_id`.
    ///
    /// `Ok(None)` when no record exists. A record with a non-positive quota fails with
    /// [`QuotaError::InvalidPolicy`]; an unreachable store with
    /// [`QuotaError::BackendUnavailable`].
    async fn find_by_id(&self, client_id: &str) -> Result<Option<ClientPolicy>, QuotaError>;
}
