use async_trait::async_trait;

use crate::domain::{BucketConfiguration, ConsumeOutcome};
use crate::error::QuotaError;

/// Shared key-value backend holding one bucket record per client.
///
/// Implementations must run initialize-if-absent, refill and deduct as a single atomic
/// unit per key, linearized by the backend itself. A read followed by a separate write is
/// not an acceptable implementation: concurrent instances would both see the same tokens.
#[async_trait]
pub trait BucketStore: Send + Sync {
    /// Atomically try to take `tokens` from the bucket under `key`.
    ///
    /// Not idempotent: retrying after an ambiguous failure may deduct twice.
    async fn try_consume(
        &self,
        key: &str,
        config: &BucketConfiguration,
        tokens: u64,
    ) -> Result<ConsumeOutcome, QuotaError>;
}
