//! In-memory bucket store - used as fallback when Redis is unavailable.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use quota_core::QuotaError;
use quota_core::clock::{Clock, SystemClock};
use quota_core::domain::{BucketConfiguration, BucketState, ConsumeOutcome};
use quota_core::ports::BucketStore;

/// In-memory bucket store using a HashMap behind one async mutex.
///
/// This is the fallback implementation when Redis is not available.
/// Note: Buckets are per-process, not shared across instances, and lost on restart.
pub struct InMemoryBucketStore {
    buckets: Mutex<HashMap<String, BucketState>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryBucketStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Current state of a bucket, if it has been touched.
    pub async fn state(&self, key: &str) -> Option<BucketState> {
        self.buckets.lock().await.get(key).copied()
    }
}

impl Default for InMemoryBucketStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BucketStore for InMemoryBucketStore {
    async fn try_consume(
        &self,
        key: &str,
        config: &BucketConfiguration,
        tokens: u64,
    ) -> Result<ConsumeOutcome, QuotaError> {
        // Init, refill and deduct all happen under the one lock.
        let mut buckets = self.buckets.lock().await;
        let now = self.clock.now_millis();

        let state = buckets
            .entry(key.to_string())
            .or_insert_with(|| BucketState::full(config, now));

        Ok(state.try_consume(config, tokens, now))
    }
}
