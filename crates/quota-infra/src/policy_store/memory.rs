//! In-memory policy store for development and tests.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use quota_core::QuotaError;
use quota_core::domain::ClientPolicy;
use quota_core::ports::PolicyStore;

/// Policy table kept in a HashMap: client id → units per interval.
///
/// Used when no database is configured. Quotas are validated on read, like rows
/// coming out of the database.
pub struct InMemoryPolicyStore {
    records: RwLock<HashMap<String, i64>>,
    interval: Duration,
}

impl InMemoryPolicyStore {
    pub fn new(interval: Duration) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            interval,
        }
    }

    /// Create or replace the quota for a client.
    pub async fn upsert(&self, client_id: impl Into<String>, units_per_interval: i64) {
        self.records
            .write()
            .await
            .insert(client_id.into(), units_per_interval);
    }

    pub async fn remove(&self, client_id: &str) {
        self.records.write().await.remove(client_id);
    }
}

#[async_trait]
impl PolicyStore for InMemoryPolicyStore {
    async fn find_by_id(&self, client_id: &str) -> Result<Option<ClientPolicy>, QuotaError> {
        let units = self.records.read().await.get(client_id).copied();
        units
            .map(|units| ClientPolicy::new(client_id, units, self.interval))
            .transpose()
    }
}
