//! Data Transfer Objects - response bodies for the API.

use serde::{Deserialize, Serialize};

/// Body of the demo endpoints behind and outside the gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreetingResponse {
    pub message: String,
}

/// Health check body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
    /// Which bucket store backs this instance (`redis` or `memory`).
    pub bucket_store: String,
    /// Which policy store backs this instance (`postgres` or `memory`).
    pub policy_store: String,
}
