//! Domain entities - the core business objects.

mod bucket;
mod decision;
mod policy;

pub use bucket::{BucketConfiguration, BucketState, ConsumeOutcome};
pub use decision::Decision;
pub use policy::ClientPolicy;
