//! Request gate - the per-request admit/deny decision.

use std::sync::Arc;

use crate::domain::Decision;
use crate::error::QuotaError;

use super::{PolicyCache, TokenBucketEngine};

/// Header carrying the client identifier on gated paths.
pub const CLIENT_ID_HEADER: &str = "X-Client-ID";

/// What to do when a backend cannot answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailureMode {
    /// Surface [`QuotaError::BackendUnavailable`]; the request is not forwarded.
    #[default]
    Closed,
    /// Forward the request without consuming.
    Open,
}

/// Gate configuration.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Paths starting with any of these prefixes are rate limited.
    pub gated_prefixes: Vec<String>,
    pub failure_mode: FailureMode,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            gated_prefixes: vec!["/v1".to_string()],
            failure_mode: FailureMode::Closed,
        }
    }
}

/// Classifies requests and consults the policy cache and bucket engine for gated ones.
pub struct RequestGate {
    policies: Arc<PolicyCache>,
    engine: Arc<TokenBucketEngine>,
    config: GateConfig,
}

impl RequestGate {
    pub fn new(
        policies: Arc<PolicyCache>,
        engine: Arc<TokenBucketEngine>,
        config: GateConfig,
    ) -> Self {
        Self {
            policies,
            engine,
            config,
        }
    }

    pub fn is_gated(&self, path: &str) -> bool {
        self.config
            .gated_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Decide what happens to a request for `path` carrying `client_id` (the raw header value).
    ///
    /// Ungated paths are forwarded without touching any backend. A gated request makes at
    /// most one consume attempt. [`QuotaError::PolicyNotFound`] and
    /// [`QuotaError::InvalidPolicy`] are returned to the caller; backend failures follow the
    /// configured [`FailureMode`].
    pub async fn decide(
        &self,
        path: &str,
        client_id: Option<&str>,
    ) -> Result<Decision, QuotaError> {
        if !self.is_gated(path) {
            return Ok(Decision::Forward { remaining: None });
        }

        let Some(client_id) = client_id.map(str::trim).filter(|id| !id.is_empty()) else {
            tracing::warn!(path = %path, "Gated request without {}", CLIENT_ID_HEADER);
            return Ok(Decision::RejectMissingIdentity);
        };

        match self.consume_one(client_id).await {
            Err(QuotaError::BackendUnavailable(reason))
                if self.config.failure_mode == FailureMode::Open =>
            {
                tracing::warn!(
                    client_id = %client_id,
                    error = %reason,
                    "Quota backend unavailable, failing open"
                );
                Ok(Decision::Forward { remaining: None })
            }
            other => other,
        }
    }

    async fn consume_one(&self, client_id: &str) -> Result<Decision, QuotaError> {
        let policy = self.policies.get(client_id).await?;
        let bucket = self.engine.resolve(&policy);
        let outcome = self.engine.consume(&bucket, 1).await?;

        if outcome.allowed {
            tracing::debug!(
                client_id = %client_id,
                remaining = outcome.remaining,
                "Request admitted"
            );
            Ok(Decision::Forward {
                remaining: Some(outcome.remaining),
            })
        } else {
            tracing::warn!(
                client_id = %client_id,
                retry_after_ms = outcome.reset_after.as_millis() as u64,
                "Rate limit exceeded"
            );
            Ok(Decision::RejectOverLimit {
                retry_after: outcome.reset_after,
            })
        }
    }
}
