//! # Quota Core
//!
//! The domain layer of the quota gate.
//! Policies, token buckets and the per-request decision live here; storage backends are
//! reached only through the traits in [`ports`].

pub mod clock;
pub mod domain;
pub mod error;
pub mod ports;
pub mod services;

pub use error::QuotaError;
