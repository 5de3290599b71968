//! Report generation modules.

pub mod export;
pub mod generator;

pub use export::*;
pub use generator::*;
