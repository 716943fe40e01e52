use std::time::Duration;

/// Outcome of gating one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Pass the request on. `remaining` is set when a bucket was consulted.
    Forward { remaining: Option<u64> },
    /// Gated path without a usable `X-Client-ID`.
    RejectMissingIdentity,
    /// Bucket exhausted; the next refill lands after `retry_after`.
    RejectOverLimit { retry_after: Duration },
}

impl Decision {
    pub fn is_forward(&self) -> bool {
        matches!(self, Decision::Forward { .. })
    }
}
