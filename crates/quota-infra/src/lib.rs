//! # Quota Infrastructure
//!
//! Concrete implementations of the ports defined in `quota-core`.
//! This crate contains the shared bucket stores and the policy stores.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external dependencies, in-memory only
//! - `postgres` - PostgreSQL policy store via SeaORM
//! - `redis` - Redis bucket store shared by every service instance

pub mod bucket_store;
pub mod policy_store;

#[cfg(feature = "postgres")]
pub mod database;

// Re-exports - In-Memory
pub use bucket_store::InMemoryBucketStore;
pub use policy_store::InMemoryPolicyStore;

// Re-exports - PostgreSQL
#[cfg(feature = "postgres")]
pub use database::{DatabaseConfig, PostgresPolicyStore};

// Re-exports - Redis
#[cfg(feature = "redis")]
pub use bucket_store::{RedisBucketStore, RedisBucketStoreConfig, RedisConfig};
