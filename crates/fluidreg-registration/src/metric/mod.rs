//! Similarity between the fixed volume and the current output.

pub mod ssd;

pub use ssd::sum_squared_difference;
