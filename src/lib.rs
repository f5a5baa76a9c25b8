//! `wbc-setpoint` library crate.
//!
//! The binary (`setpoint`) is a thin wrapper around this library so that:
//!
//! - the fitting core is testable without spawning processes
//! - the CLI and the TUI share one pipeline
//!
//! Core: `fit` (EM engine, model selection, cumulative trend) on top of
//! `math` and `models`. Everything else is input, output and presentation.

pub mod app;
pub mod cli;
pub mod data;
pub mod debug;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod tui;
