//! SeaORM entities.

pub mod user_rate;
