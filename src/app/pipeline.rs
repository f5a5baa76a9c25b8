//! Shared "fit pipeline" logic used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! values (parsed or synthetic) -> model selection -> cumulative trend -> density grid
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use tracing::info;

use crate::data::{SampleData, generate_sample};
use crate::domain::{CumulativePoint, DensityCurve, RunConfig, WBC_DOMAIN};
use crate::error::AppError;
use crate::fit::{EmOptions, ModelSelection, cumulative_fit_with_options, select_model_with_options};
use crate::io::ingest::{Series, SeriesSource, load_values, parse_values};
use crate::models::{DEFAULT_CURVE_STEPS, density_curve, plot_range};

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub series: Series,
    /// Present when the values were generated rather than supplied.
    pub sample: Option<SampleData>,
    pub selection: ModelSelection,
    pub trend: Vec<Option<CumulativePoint>>,
    pub density: DensityCurve,
}

/// Resolve the input series for a run.
///
/// Precedence: values file, then the inline list, then a synthetic series.
pub fn resolve_series(config: &RunConfig) -> Result<(Series, Option<SampleData>), AppError> {
    if let Some(path) = &config.values_file {
        return Ok((load_values(path, &WBC_DOMAIN)?, None));
    }
    if let Some(text) = &config.values {
        let values = parse_values(text, &WBC_DOMAIN)?;
        return Ok((Series::new(values, SeriesSource::Input)?, None));
    }

    let sample = generate_sample(config)?;
    let source = SeriesSource::Synthetic {
        preset: sample.preset.display_name().to_string(),
        seed: sample.seed,
    };
    let series = Series::new(sample.values.clone(), source)?;
    Ok((series, Some(sample)))
}

/// Execute the full pipeline and return the computed outputs.
pub fn run_fit(config: &RunConfig) -> Result<RunOutput, AppError> {
    let (series, sample) = resolve_series(config)?;
    Ok(fit_series(series, sample, config))
}

/// Fit an already validated series.
///
/// This is useful for the TUI, which validates the input line itself.
pub fn fit_series(series: Series, sample: Option<SampleData>, config: &RunConfig) -> RunOutput {
    let opts = EmOptions {
        collapse: config.collapse,
        ..EmOptions::default()
    };

    let selection = select_model_with_options(&series.values, &opts);
    let trend = cumulative_fit_with_options(&series.values, &opts);
    let (x_min, x_max) = plot_range(&series.values);
    let density = density_curve(&selection.best.model, x_min, x_max, DEFAULT_CURVE_STEPS);

    info!(
        n = series.values.len(),
        k = selection.best.model.component_count,
        outcome = ?selection.outcome,
        "fit pipeline finished"
    );

    RunOutput {
        series,
        sample,
        selection,
        trend,
        density,
    }
}
