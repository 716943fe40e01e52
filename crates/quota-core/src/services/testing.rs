//! Test doubles for the core ports.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::clock::{Clock, ManualClock};
use crate::domain::{BucketConfiguration, BucketState, ClientPolicy, ConsumeOutcome};
use crate::error::QuotaError;
use crate::ports::{BucketStore, PolicyStore};

/// Policy store over a fixed map that counts every read.
#[derive(Default)]
pub struct CountingPolicyStore {
    records: Mutex<HashMap<String, i64>>,
    interval: Duration,
    reads: AtomicUsize,
}

impl CountingPolicyStore {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    pub fn with(self, client_id: &str, units: i64) -> Self {
        self.set(client_id, units);
        self
    }

    pub fn set(&self, client_id: &str, units: i64) {
        self.records
            .lock()
            .unwrap()
            .insert(client_id.to_string(), units);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PolicyStore for CountingPolicyStore {
    async fn find_by_id(&self, client_id: &str) -> Result<Option<ClientPolicy>, QuotaError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let units = self.records.lock().unwrap().get(client_id).copied();
        units
            .map(|units| ClientPolicy::new(client_id, units, self.interval))
            .transpose()
    }
}

/// Single-mutex bucket store driven by a manual clock.
#[derive(Default)]
pub struct MutexBucketStore {
    buckets: Mutex<HashMap<String, BucketState>>,
    pub clock: ManualClock,
}

#[async_trait]
impl BucketStore for MutexBucketStore {
    async fn try_consume(
        &self,
        key: &str,
        config: &BucketConfiguration,
        tokens: u64,
    ) -> Result<ConsumeOutcome, QuotaError> {
        let now = self.clock.now_millis();
        let mut buckets = self.buckets.lock().unwrap();
        let state = buckets
            .entry(key.to_string())
            .or_insert_with(|| BucketState::full(config, now));
        Ok(state.try_consume(config, tokens, now))
    }
}

/// Bucket store that always fails, or hangs past any timeout.
pub enum BrokenBucketStore {
    Unreachable,
    Hanging,
}

#[async_trait]
impl BucketStore for BrokenBucketStore {
    async fn try_consume(
        &self,
        _key: &str,
        _config: &BucketConfiguration,
        _tokens: u64,
    ) -> Result<ConsumeOutcome, QuotaError> {
        match self {
            BrokenBucketStore::Unreachable => Err(QuotaError::BackendUnavailable(
                "connection refused".to_string(),
            )),
            BrokenBucketStore::Hanging => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(QuotaError::BackendUnavailable("unreachable".to_string()))
            }
        }
    }
}
