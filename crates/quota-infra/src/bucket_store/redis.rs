//! Redis bucket store - one hash per client, mutated only by a Lua script.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, Script};

use quota_core::QuotaError;
use quota_core::domain::{BucketConfiguration, ConsumeOutcome};
use quota_core::ports::BucketStore;

/// Redis connection configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis URL (e.g., redis://localhost:6379)
    pub url: String,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Whether to fallback to the in-memory store if Redis is unavailable at startup
    pub fallback_to_memory: bool,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connect_timeout: Duration::from_secs(5),
            fallback_to_memory: true,
        }
    }
}

impl RedisConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            connect_timeout: Duration::from_secs(
                std::env::var("REDIS_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            fallback_to_memory: std::env::var("REDIS_FALLBACK_TO_MEMORY")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
        }
    }
}

/// Redis bucket store configuration.
#[derive(Debug, Clone)]
pub struct RedisBucketStoreConfig {
    /// Redis connection config
    pub redis: RedisConfig,
    /// Key prefix for bucket keys
    pub key_prefix: String,
}

impl Default for RedisBucketStoreConfig {
    fn default() -> Self {
        Self {
            redis: RedisConfig::default(),
            key_prefix: "ratelimit".to_string(),
        }
    }
}

impl RedisBucketStoreConfig {
    pub fn from_env() -> Self {
        Self {
            redis: RedisConfig::from_env(),
            key_prefix: std::env::var("RATE_LIMIT_KEY_PREFIX")
                .unwrap_or_else(|_| "ratelimit".to_string()),
        }
    }
}

// KEYS[1] = bucket key
// ARGV = capacity, refill_tokens, interval_ms, requested
// Returns {allowed (0|1), remaining, reset_after_ms}
//
// Time comes from the Redis server so every instance agrees on interval boundaries.
// The record expires after two idle intervals; by then a live record would be full anyway.
const CONSUME_SCRIPT: &str = r#"
redis.replicate_commands()

local key = KEYS[1]
local capacity = tonumber(ARGV[1])
local refill = tonumber(ARGV[2])
local interval_ms = tonumber(ARGV[3])
local requested = tonumber(ARGV[4])

local t = redis.call('TIME')
local now = tonumber(t[1]) * 1000 + math.floor(tonumber(t[2]) / 1000)

local state = redis.call('HMGET', key, 'tokens', 'last_refill_ms')
local tokens = tonumber(state[1])
local last = tonumber(state[2])
if tokens == nil or last == nil then
    tokens = capacity
    last = now
end

tokens = math.min(tokens, capacity)
if now > last then
    local intervals = math.floor((now - last) / interval_ms)
    if intervals > 0 then
        tokens = math.min(capacity, tokens + intervals * refill)
        last = last + intervals * interval_ms
    end
end

local allowed = 0
if tokens >= requested then
    tokens = tokens - requested
    allowed = 1
end

redis.call('HSET', key, 'tokens', tokens, 'last_refill_ms', last)
redis.call('PEXPIRE', key, interval_ms * 2)

local reset_after = math.max(1, interval_ms - math.max(0, now - last))
return {allowed, tokens, reset_after}
"#;

/// Redis-backed bucket store.
///
/// Every consume is one `EVALSHA` of [`CONSUME_SCRIPT`], so Redis linearizes concurrent
/// consumes for a key across all service instances.
pub struct RedisBucketStore {
    conn: ConnectionManager,
    config: RedisBucketStoreConfig,
    script: Script,
}

impl RedisBucketStore {
    pub async fn new(config: RedisBucketStoreConfig) -> Result<Self, QuotaError> {
        let client = Client::open(config.redis.url.as_str())
            .map_err(|e| QuotaError::BackendUnavailable(e.to_string()))?;

        // Use timeout to prevent hanging if Redis is unreachable
        let conn_manager_fut = ConnectionManager::new(client);
        let conn = tokio::time::timeout(config.redis.connect_timeout, conn_manager_fut)
            .await
            .map_err(|_| QuotaError::BackendUnavailable("Connection timed out".to_string()))?
            .map_err(|e| QuotaError::BackendUnavailable(e.to_string()))?;

        tracing::info!(url = %config.redis.url, "Connected to Redis bucket store");

        Ok(Self {
            conn,
            config,
            script: Script::new(CONSUME_SCRIPT),
        })
    }

    /// Create from environment configuration.
    pub async fn from_env() -> Result<Self, QuotaError> {
        Self::new(RedisBucketStoreConfig::from_env()).await
    }

    fn make_key(&self, key: &str) -> String {
        format!("{}:{}", self.config.key_prefix, key)
    }
}

#[async_trait]
impl BucketStore for RedisBucketStore {
    async fn try_consume(
        &self,
        key: &str,
        config: &BucketConfiguration,
        tokens: u64,
    ) -> Result<ConsumeOutcome, QuotaError> {
        let redis_key = self.make_key(key);
        let mut conn = self.conn.clone();

        let result: Vec<i64> = self
            .script
            .key(&redis_key)
            .arg(config.capacity)
            .arg(config.refill_tokens)
            .arg(config.interval_millis())
            .arg(tokens)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                tracing::warn!(key = %redis_key, error = %e, "Redis consume failed");
                QuotaError::BackendUnavailable(e.to_string())
            })?;

        let [allowed, remaining, reset_after_ms] = result[..] else {
            return Err(QuotaError::BackendUnavailable(format!(
                "Unexpected consume reply: {result:?}"
            )));
        };

        Ok(ConsumeOutcome {
            allowed: allowed == 1,
            remaining: remaining.max(0) as u64,
            reset_after: Duration::from_millis(reset_after_ms.max(1) as u64),
        })
    }
}
