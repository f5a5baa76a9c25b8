//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV
//! - reloaded later for plotting

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::serde_nan;
use crate::math::argmax;

/// A fitted univariate Gaussian mixture.
///
/// `means`, `variances` and `weights` are index-aligned and all have
/// `component_count` entries. Fields may hold NaN when a component collapsed
/// during EM or when a variance could not be estimated from too few samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixtureModel {
    pub component_count: usize,
    #[serde(with = "serde_nan::vec")]
    pub means: Vec<f64>,
    #[serde(with = "serde_nan::vec")]
    pub variances: Vec<f64>,
    /// Raw EM mixture proportions.
    ///
    /// Each E-step row is divided by `row_sum + 1e-10`, so samples that no
    /// component explains contribute almost nothing and these can sum to
    /// noticeably less than 1. See [`MixtureModel::normalized_weights`].
    #[serde(with = "serde_nan::vec")]
    pub weights: Vec<f64>,
    /// Produced by the small-sample path (plain mean/variance, no EM).
    pub is_degenerate: bool,
    #[serde(with = "serde_nan::scalar")]
    pub log_likelihood: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl MixtureModel {
    /// Index of the component with the largest weight (first on ties).
    pub fn dominant_component(&self) -> Option<usize> {
        argmax(&self.weights)
    }

    /// Largest weight, NaN if every weight is NaN.
    pub fn max_weight(&self) -> f64 {
        self.dominant_component()
            .map(|j| self.weights[j])
            .unwrap_or(f64::NAN)
    }

    /// Weights rescaled to sum to 1.
    pub fn normalized_weights(&self) -> Vec<f64> {
        let total: f64 = self.weights.iter().sum();
        self.weights.iter().map(|w| w / total).collect()
    }

    pub fn std_dev(&self, component: usize) -> f64 {
        self.variances[component].sqrt()
    }
}

/// A candidate model with its information criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredModel {
    pub model: MixtureModel,
    /// NaN for degenerate (unscored) models.
    #[serde(with = "serde_nan::scalar")]
    pub bic: f64,
    /// `max(weights) >= 0.5`.
    pub satisfies_dominance_constraint: bool,
}

/// How the selector arrived at its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionOutcome {
    /// Fewer than 5 samples: plain mean/variance, nothing scored.
    Degenerate,
    /// Minimum BIC among candidates satisfying the dominance constraint.
    Constrained,
    /// No candidate satisfied the constraint; the k=1 fit was returned.
    Fallback,
}

impl SelectionOutcome {
    pub fn label(self) -> &'static str {
        match self {
            SelectionOutcome::Degenerate => "degenerate (n < 5, sample statistics)",
            SelectionOutcome::Constrained => "minimum BIC among dominant-weight candidates",
            SelectionOutcome::Fallback => "fallback to k=1 (no candidate has a weight >= 0.5)",
        }
    }
}

/// One index of the rolling setpoint trend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CumulativePoint {
    pub index: usize,
    #[serde(with = "serde_nan::scalar")]
    pub mean: f64,
    #[serde(with = "serde_nan::scalar")]
    pub lower: f64,
    #[serde(with = "serde_nan::scalar")]
    pub upper: f64,
    /// Component count of the model that produced the point.
    pub components: usize,
}

/// Weighted density curves of a fitted mixture on a regular grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityCurve {
    pub x: Vec<f64>,
    /// `weight_j * pdf_j(x)` per component.
    #[serde(with = "serde_nan::nested")]
    pub components: Vec<Vec<f64>>,
    /// Sum over components.
    #[serde(with = "serde_nan::vec")]
    pub total: Vec<f64>,
}

/// What to do when an EM component stops receiving responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CollapsePolicy {
    /// Leave the NaN/infinite parameters in place.
    #[default]
    Propagate,
    /// Re-seed the component at the least explained sample.
    Reseed,
}

/// Synthetic WBC series shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Stable baseline with occasional acute excursions.
    Setpoint,
    /// Two equally sized populations.
    Bimodal,
    /// Baseline only.
    Steady,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::Setpoint, Preset::Bimodal, Preset::Steady];

    pub fn display_name(self) -> &'static str {
        match self {
            Preset::Setpoint => "setpoint + excursions",
            Preset::Bimodal => "bimodal",
            Preset::Steady => "steady",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Preset::Setpoint => Preset::Bimodal,
            Preset::Bimodal => Preset::Steady,
            Preset::Steady => Preset::Setpoint,
        }
    }
}

/// Open interval of plausible measurement values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueDomain {
    pub min: f64,
    pub max: f64,
    pub label: &'static str,
}

impl ValueDomain {
    pub fn contains(&self, v: f64) -> bool {
        v > self.min && v < self.max
    }
}

/// WBC counts in 10^9/L.
pub const WBC_DOMAIN: ValueDomain = ValueDomain {
    min: 0.0,
    max: 100.0,
    label: "WBC (10^9/L)",
};

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus environment and defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Comma-separated measurements. `None` means: generate a synthetic series.
    pub values: Option<String>,
    /// File with measurements in the same syntax; takes precedence over `values`.
    pub values_file: Option<PathBuf>,
    pub preset: Preset,
    pub sample_count: usize,
    pub seed: u64,
    /// Probability of an acute excursion per draw (`setpoint` preset).
    pub excursion_prob: f64,
    pub collapse: CollapsePolicy,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_fit: Option<PathBuf>,
    pub export_trend: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            values: None,
            values_file: None,
            preset: Preset::Setpoint,
            sample_count: 24,
            seed: 42,
            excursion_prob: 0.15,
            collapse: CollapsePolicy::Propagate,
            plot: true,
            plot_width: 80,
            plot_height: 20,
            export_fit: None,
            export_trend: None,
        }
    }
}

/// A saved fit (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub values: Vec<f64>,
    pub outcome: SelectionOutcome,
    pub best: ScoredModel,
    pub candidates: Vec<ScoredModel>,
    pub density: DensityCurve,
    pub trend: Vec<Option<CumulativePoint>>,
}
