//! Domain layer - core analysis logic and entities

pub mod market;
pub mod rates;
pub mod snapshot;
