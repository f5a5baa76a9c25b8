//! Gaussian mixture density evaluation.
//!
//! Kept as small, pure functions so that fitting, reporting and rendering code
//! can share them.

pub mod mixture;

pub use mixture::*;
