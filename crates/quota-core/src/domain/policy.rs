use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::QuotaError;

/// Quota policy for one client: `units_per_interval` requests every `interval`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientPolicy {
    pub client_id: String,
    pub units_per_interval: u64,
    pub interval: Duration,
}

impl ClientPolicy {
    /// Build a policy, rejecting a non-positive quota or a zero interval.
    ///
    /// The quota is taken as a signed value because storage columns are signed and a
    /// negative row must surface as [`QuotaError::InvalidPolicy`] rather than wrap around.
    pub fn new(
        client_id: impl Into<String>,
        units_per_interval: i64,
        interval: Duration,
    ) -> Result<Self, QuotaError> {
        let client_id = client_id.into();

        if units_per_interval <= 0 {
            return Err(QuotaError::invalid_policy(
                client_id,
                format!("quota must be positive, got {units_per_interval}"),
            ));
        }
        if interval.is_zero() {
            return Err(QuotaError::invalid_policy(
                client_id,
                "refill interval must be non-zero",
            ));
        }

        Ok(Self {
            client_id,
            units_per_interval: units_per_interval as u64,
            interval,
        })
    }
}
