//! Offline analysis of saved result files.

pub mod load;
pub mod plots;
pub mod summary;
pub mod units;
pub mod violin;
