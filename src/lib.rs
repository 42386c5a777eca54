//! Longitudinal wave merging: load one table per wave, validate a shared
//! identifier, and combine the waves into a wide or long table.

pub mod cache;
pub mod dedup;
pub mod error;
pub mod export;
pub mod join;
pub mod load;
pub mod long;
pub mod preprocess;
pub mod preview;
pub mod session;
pub mod table;
pub mod validate;
pub mod wide;
