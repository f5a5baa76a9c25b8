//! Mixture fitting orchestration.
//!
//! Responsibilities:
//!
//! - fit a univariate Gaussian mixture for a given component count (EM)
//! - score k = 1..3 and select one using BIC + a dominance guardrail
//! - refit growing prefixes to build the rolling setpoint band

pub mod cumulative;
pub mod em;
pub mod selection;

pub use cumulative::*;
pub use em::*;
pub use selection::*;
