//! Core services: the policy cache, the token bucket engine and the request gate.

mod gate;
mod policy_cache;
mod token_bucket;

#[cfg(test)]
pub(crate) mod testing;

pub use gate::{CLIENT_ID_HEADER, FailureMode, GateConfig, RequestGate};
pub use policy_cache::PolicyCache;
pub use token_bucket::{BucketHandle, TokenBucketEngine};
