//! Application configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use quota_core::services::{FailureMode, GateConfig};

#[cfg(feature = "postgres")]
use quota_infra::DatabaseConfig;
#[cfg(feature = "redis")]
use quota_infra::RedisBucketStoreConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub rate_limit: RateLimitConfig,
    /// Policies loaded into the in-memory store when no database is configured.
    pub policy_seed: Vec<(String, i64)>,
    /// Policy database; in-memory policies when absent.
    #[cfg(feature = "postgres")]
    pub database: Option<DatabaseConfig>,
    /// Shared bucket store; per-process buckets when absent.
    #[cfg(feature = "redis")]
    pub redis: Option<RedisBucketStoreConfig>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            rate_limit: RateLimitConfig::from_env(),
            policy_seed: env::var("POLICY_SEED")
                .map(|v| parse_policy_seed(&v))
                .unwrap_or_default(),
            #[cfg(feature = "postgres")]
            database: DatabaseConfig::from_env(),
            #[cfg(feature = "redis")]
            redis: env::var("REDIS_URL")
                .ok()
                .map(|_| RedisBucketStoreConfig::from_env()),
        }
    }
}

/// Quota settings shared by the gate, the engine and the cache sweep.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub gate: GateConfig,
    /// Period every policy's quota refills over.
    pub refill_interval: Duration,
    /// Upper bound on any single policy or bucket store call.
    pub backend_timeout: Duration,
    /// How often the policy cache is cleared.
    pub cache_sweep_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            gate: GateConfig::default(),
            refill_interval: Duration::from_secs(60),
            backend_timeout: Duration::from_millis(500),
            cache_sweep_interval: Duration::from_secs(300),
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let gated_prefixes = env::var("RATE_LIMIT_GATED_PREFIXES")
            .map(|v| parse_prefixes(&v))
            .ok()
            .filter(|prefixes| !prefixes.is_empty())
            .unwrap_or(defaults.gate.gated_prefixes);

        let failure_mode = match env::var("RATE_LIMIT_FAIL_OPEN") {
            Ok(v) if v == "true" || v == "1" => FailureMode::Open,
            _ => FailureMode::Closed,
        };

        Self {
            gate: GateConfig {
                gated_prefixes,
                failure_mode,
            },
            refill_interval: env::var("RATE_LIMIT_REFILL_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.refill_interval),
            backend_timeout: env::var("RATE_LIMIT_BACKEND_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.backend_timeout),
            cache_sweep_interval: env::var("POLICY_CACHE_SWEEP_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_sweep_interval),
        }
    }
}

/// Parse a comma-separated prefix list. Example: `/v1, /internal/`
fn parse_prefixes(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

/// Parse seed policies.
/// Format: POLICY_SEED=<CLIENT_ID>:<UNITS>,...
/// Example: POLICY_SEED=1:5,2:100
fn parse_policy_seed(value: &str) -> Vec<(String, i64)> {
    value
        .split(',')
        .filter_map(|entry| {
            let (client_id, units) = entry.trim().split_once(':')?;
            let units = units.trim().parse().ok()?;
            Some((client_id.trim().to_string(), units))
        })
        .filter(|(client_id, _)| !client_id.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_seed_skips_malformed_entries() {
        assert_eq!(
            parse_policy_seed("1:5, 2:100,bad,3:x,:4"),
            vec![("1".to_string(), 5), ("2".to_string(), 100)]
        );
    }

    #[test]
    fn prefixes_are_trimmed_and_blank_entries_dropped() {
        assert_eq!(parse_prefixes("/v1, /internal/ ,,"), vec!["/v1", "/internal/"]);
        assert!(parse_prefixes(" , ").is_empty());
    }

    #[test]
    fn defaults_match_reference_behavior() {
        let config = RateLimitConfig::default();
        assert_eq!(config.gate.gated_prefixes, vec!["/v1"]);
        assert_eq!(config.gate.failure_mode, FailureMode::Closed);
        assert_eq!(config.refill_interval, Duration::from_secs(60));
    }
}
