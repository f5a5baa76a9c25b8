//! Terminal renderings of a fit.

pub mod ascii;

pub use ascii::*;
