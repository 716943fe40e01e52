//! Read-through, process-local policy cache with coarse invalidation.
//!
//! Entries never expire on their own; a scheduled sweep calls [`PolicyCache::clear`] and drops
//! everything at once. Staleness is bounded by the sweep period. Right after a sweep every
//! active client misses together and hits the policy store at the same time; the store read
//! is cheap next to request volume, so this thundering herd is accepted.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::ClientPolicy;
use crate::error::QuotaError;
use crate::ports::PolicyStore;

struct CacheEntry {
    policy: ClientPolicy,
    inserted_at: DateTime<Utc>,
}

/// Client-id → policy cache in front of a [`PolicyStore`].
pub struct PolicyCache {
    store: Arc<dyn PolicyStore>,
    entries: RwLock<HashMap<String, CacheEntry>>,
    timeout: Duration,
}

impl PolicyCache {
    pub fn new(store: Arc<dyn PolicyStore>, timeout: Duration) -> Self {
        Self {
            store,
            entries: RwLock::new(HashMap::new()),
            timeout,
        }
    }

    /// Return the cached policy, reading through to the store on a miss.
    ///
    /// Only successful lookups are cached; unknown clients hit the store every time.
    pub async fn get(&self, client_id: &str) -> Result<ClientPolicy, QuotaError> {
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(client_id) {
                return Ok(entry.policy.clone());
            }
        }

        tracing::debug!(client_id = %client_id, "Policy cache miss");

        let policy = tokio::time::timeout(self.timeout, self.store.find_by_id(client_id))
            .await
            .map_err(|_| QuotaError::BackendUnavailable("Policy store timed out".to_string()))??
            .ok_or_else(|| QuotaError::PolicyNotFound {
                client_id: client_id.to_string(),
            })?;

        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(client_id.to_string())
            .or_insert_with(|| CacheEntry {
                policy,
                inserted_at: Utc::now(),
            });
        Ok(entry.policy.clone())
    }

    /// Drop every entry in one step. Returns how many were evicted.
    ///
    /// Runs under the write lock, so readers see the map either before or after the sweep.
    pub async fn clear(&self) -> usize {
        let mut entries = self.entries.write().await;
        let evicted = entries.len();
        if let Some(oldest) = entries.values().map(|entry| entry.inserted_at).min() {
            tracing::debug!(evicted, oldest = %oldest, "Clearing policy cache");
        }
        entries.clear();
        evicted
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
