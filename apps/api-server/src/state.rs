//! Application state - the gate and its collaborators, wired once at startup.

use std::sync::Arc;

use quota_core::ports::{BucketStore, PolicyStore};
use quota_core::services::{PolicyCache, RequestGate, TokenBucketEngine};
use quota_infra::{InMemoryBucketStore, InMemoryPolicyStore};

use crate::config::{AppConfig, RateLimitConfig};

#[cfg(feature = "postgres")]
use quota_infra::PostgresPolicyStore;
#[cfg(feature = "redis")]
use quota_infra::RedisBucketStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<RequestGate>,
    pub policies: Arc<PolicyCache>,
    pub backends: Backends,
}

/// Names of the stores in use, reported by the health check.
#[derive(Debug, Clone, Copy)]
pub struct Backends {
    pub bucket_store: &'static str,
    pub policy_store: &'static str,
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let interval = config.rate_limit.refill_interval;

        #[cfg(feature = "postgres")]
        let postgres: Option<Arc<dyn PolicyStore>> = match &config.database {
            Some(db_config) => match quota_infra::database::connect(db_config).await {
                Ok(conn) => {
                    Some(Arc::new(PostgresPolicyStore::new(conn, interval)) as Arc<dyn PolicyStore>)
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to connect to database: {}. Using in-memory policies.",
                        e
                    );
                    None
                }
            },
            None => None,
        };
        #[cfg(not(feature = "postgres"))]
        let postgres: Option<Arc<dyn PolicyStore>> = None;

        let (policy_store, policy_store_name): (Arc<dyn PolicyStore>, _) = match postgres {
            Some(store) => (store, "postgres"),
            None => {
                tracing::warn!(
                    seeded = config.policy_seed.len(),
                    "No policy database. Running with in-memory policies."
                );
                let store = InMemoryPolicyStore::new(interval);
                for (client_id, units) in &config.policy_seed {
                    store.upsert(client_id.clone(), *units).await;
                }
                (Arc::new(store) as Arc<dyn PolicyStore>, "memory")
            }
        };

        #[cfg(feature = "redis")]
        let redis: Option<Arc<dyn BucketStore>> = match &config.redis {
            Some(redis_config) => match RedisBucketStore::new(redis_config.clone()).await {
                Ok(store) => Some(Arc::new(store) as Arc<dyn BucketStore>),
                Err(e) if redis_config.redis.fallback_to_memory => {
                    tracing::error!(
                        "Failed to connect to Redis: {}. Falling back to per-process buckets.",
                        e
                    );
                    None
                }
                Err(e) => return Err(e.into()),
            },
            None => None,
        };
        #[cfg(not(feature = "redis"))]
        let redis: Option<Arc<dyn BucketStore>> = None;

        let (bucket_store, bucket_store_name): (Arc<dyn BucketStore>, _) = match redis {
            Some(store) => (store, "redis"),
            None => {
                tracing::warn!("No Redis configured. Quotas are enforced per process only.");
                (
                    Arc::new(InMemoryBucketStore::new()) as Arc<dyn BucketStore>,
                    "memory",
                )
            }
        };

        let state = Self::from_parts(
            policy_store,
            bucket_store,
            &config.rate_limit,
            Backends {
                bucket_store: bucket_store_name,
                policy_store: policy_store_name,
            },
        );

        tracing::info!(
            bucket_store = bucket_store_name,
            policy_store = policy_store_name,
            gated_prefixes = ?config.rate_limit.gate.gated_prefixes,
            failure_mode = ?config.rate_limit.gate.failure_mode,
            "Application state initialized"
        );

        Ok(state)
    }

    /// Wire the cache, engine and gate over the given stores.
    pub fn from_parts(
        policy_store: Arc<dyn PolicyStore>,
        bucket_store: Arc<dyn BucketStore>,
        config: &RateLimitConfig,
        backends: Backends,
    ) -> Self {
        let policies = Arc::new(PolicyCache::new(policy_store, config.backend_timeout));
        let engine = Arc::new(TokenBucketEngine::new(bucket_store, config.backend_timeout));
        let gate = Arc::new(RequestGate::new(
            policies.clone(),
            engine,
            config.gate.clone(),
        ));

        Self {
            gate,
            policies,
            backends,
        }
    }
}
