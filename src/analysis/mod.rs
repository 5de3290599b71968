//! Analysis modules.
//!
//! Aggregation, classification, filtering and ranking of production data.

pub mod aggregator;

pub use aggregator::*;
