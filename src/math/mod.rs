//! Mathematical utilities: the normal density and descriptive statistics.

pub mod gaussian;
pub mod stats;

pub use gaussian::*;
pub use stats::*;
