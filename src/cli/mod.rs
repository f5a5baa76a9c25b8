//! Command-line parsing for the WBC setpoint fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the fitting code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{CollapsePolicy, Preset};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "setpoint", version, about = "WBC setpoint estimation with Gaussian mixtures")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit k = 1..3 mixtures, select one, print the report and optionally plot/export.
    Fit(FitArgs),
    /// Print the cumulative setpoint trend (one row per value).
    Trend(FitArgs),
    /// Plot the density stored in a previously exported fit JSON.
    Plot(PlotArgs),
    /// Launch the interactive TUI.
    ///
    /// This uses the same underlying pipeline as `setpoint fit`, but renders
    /// results in a terminal UI using Ratatui.
    Tui(FitArgs),
}

/// Common options for fitting.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Comma-separated WBC values (10^9/L). Without this a synthetic series is generated.
    #[arg(long, value_name = "LIST", allow_hyphen_values = true)]
    pub values: Option<String>,

    /// Read values from a file (same syntax as --values).
    #[arg(long, value_name = "PATH", conflicts_with = "values")]
    pub file: Option<PathBuf>,

    /// Synthetic series shape.
    #[arg(long, value_enum, env = "SETPOINT_PRESET", default_value_t = Preset::Setpoint)]
    pub preset: Preset,

    /// Number of synthetic values to generate.
    #[arg(short = 'n', long = "count", env = "SETPOINT_COUNT", default_value_t = 24)]
    pub count: usize,

    /// Random seed for synthetic values.
    #[arg(long, env = "SETPOINT_SEED", default_value_t = 42)]
    pub seed: u64,

    /// Probability of an acute excursion per draw (`setpoint` preset).
    #[arg(long, default_value_t = 0.15)]
    pub excursion_prob: f64,

    /// What EM does with a component that stops receiving responsibility.
    #[arg(long, value_enum, default_value_t = CollapsePolicy::Propagate)]
    pub collapse: CollapsePolicy,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Export the fit (values, candidates, density grid, trend) to JSON.
    #[arg(long = "export-fit", value_name = "JSON")]
    pub export_fit: Option<PathBuf>,

    /// Export the cumulative trend to CSV.
    #[arg(long = "export-trend", value_name = "CSV")]
    pub export_trend: Option<PathBuf>,
}

/// Options for plotting a saved fit.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Fit JSON file produced by `setpoint fit --export-fit`.
    #[arg(long, value_name = "JSON")]
    pub fit: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}
