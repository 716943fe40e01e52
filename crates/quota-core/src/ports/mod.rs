//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod bucket_store;
mod policy_store;

pub use bucket_store::BucketStore;
pub use policy_store::PolicyStore;
