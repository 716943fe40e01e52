//! Token bucket engine over a shared [`BucketStore`].

use std::sync::Arc;
use std::time::Duration;

use crate::domain::{BucketConfiguration, ClientPolicy, ConsumeOutcome};
use crate::error::QuotaError;
use crate::ports::BucketStore;

/// Address of one client's bucket plus the configuration to apply to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketHandle {
    pub key: String,
    pub config: BucketConfiguration,
}

/// Resolves bucket handles from policies and consumes tokens through the store.
///
/// Holds no per-client state and takes no in-process lock; the store serializes
/// concurrent consumes for a key across every instance.
pub struct TokenBucketEngine {
    store: Arc<dyn BucketStore>,
    timeout: Duration,
}

impl TokenBucketEngine {
    pub fn new(store: Arc<dyn BucketStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Derive the handle for `policy`. Pure: the bucket is created lazily by the first consume.
    pub fn resolve(&self, policy: &ClientPolicy) -> BucketHandle {
        BucketHandle {
            key: policy.client_id.clone(),
            config: BucketConfiguration::from(policy),
        }
    }

    /// Atomically take `tokens` from the bucket.
    ///
    /// A call exceeding the backend timeout fails with [`QuotaError::BackendUnavailable`].
    /// No retry is attempted: a consume whose outcome is unknown may already have deducted.
    pub async fn consume(
        &self,
        handle: &BucketHandle,
        tokens: u64,
    ) -> Result<ConsumeOutcome, QuotaError> {
        tokio::time::timeout(
            self.timeout,
            self.store.try_consume(&handle.key, &handle.config, tokens),
        )
        .await
        .map_err(|_| QuotaError::BackendUnavailable("Bucket store timed out".to_string()))?
    }
}
