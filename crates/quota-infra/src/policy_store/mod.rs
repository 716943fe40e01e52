//! Policy store implementations. The PostgreSQL store lives in [`crate::database`].

mod memory;

pub use memory::InMemoryPolicyStore;
