//! PostgreSQL policy storage.

mod connections;
pub mod entity;
mod policy_repo;

pub use connections::{DatabaseConfig, connect};
pub use policy_repo::PostgresPolicyStore;

#[cfg(test)]
mod tests;
