//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - fit outputs (`MixtureModel`, `ScoredModel`, `CumulativePoint`, `DensityCurve`)
//! - configuration enums (`Preset`, `CollapsePolicy`) and `RunConfig`
//! - the exported fit file schema (`FitFile`)

pub mod serde_nan;
pub mod types;

pub use types::*;
