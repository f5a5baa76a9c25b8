//! Synthetic WBC series for demos and tests.
//!
//! Draws are seeded so a given `(preset, count, seed, excursion_prob)` always
//! produces the same series.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use tracing::debug;

use crate::domain::{Preset, RunConfig, WBC_DOMAIN};
use crate::error::AppError;

/// Baseline (setpoint) population.
const BASELINE_MEAN: f64 = 6.0;
const BASELINE_SD: f64 = 0.8;

/// Acute excursions (infection, stress response).
const EXCURSION_MEAN: f64 = 14.0;
const EXCURSION_SD: f64 = 2.0;

/// Second population of the `bimodal` preset.
const SECOND_MODE_MEAN: f64 = 14.0;
const SECOND_MODE_SD: f64 = 0.8;

/// Smallest value kept after clamping into the open domain.
const FLOOR: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct SampleData {
    pub values: Vec<f64>,
    pub preset: Preset,
    pub seed: u64,
}

pub fn generate_sample(config: &RunConfig) -> Result<SampleData, AppError> {
    if config.sample_count == 0 {
        return Err(AppError::invalid_input("Sample count must be > 0."));
    }
    if !(config.excursion_prob.is_finite() && (0.0..1.0).contains(&config.excursion_prob)) {
        return Err(AppError::invalid_input(format!(
            "Excursion probability must be in [0, 1), got {}.",
            config.excursion_prob
        )));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let baseline = normal(BASELINE_MEAN, BASELINE_SD)?;
    let excursion = normal(EXCURSION_MEAN, EXCURSION_SD)?;
    let second = normal(SECOND_MODE_MEAN, SECOND_MODE_SD)?;

    let values = (0..config.sample_count)
        .map(|i| {
            let raw = match config.preset {
                Preset::Steady => baseline.sample(&mut rng),
                Preset::Bimodal if i % 2 == 1 => second.sample(&mut rng),
                Preset::Bimodal => baseline.sample(&mut rng),
                Preset::Setpoint => {
                    if rng.gen_bool(config.excursion_prob) {
                        excursion.sample(&mut rng)
                    } else {
                        baseline.sample(&mut rng)
                    }
                }
            };
            to_lab_value(raw)
        })
        .collect::<Vec<f64>>();

    debug!(
        preset = ?config.preset,
        n = values.len(),
        seed = config.seed,
        "generated synthetic series"
    );

    Ok(SampleData {
        values,
        preset: config.preset,
        seed: config.seed,
    })
}

fn normal(mean: f64, sd: f64) -> Result<Normal<f64>, AppError> {
    Normal::new(mean, sd).map_err(|e| AppError::runtime(format!("Noise distribution error: {e}")))
}

/// Clamp into the open WBC domain and round to one decimal like a lab report.
fn to_lab_value(raw: f64) -> f64 {
    let clamped = raw.clamp(WBC_DOMAIN.min + FLOOR, WBC_DOMAIN.max - FLOOR);
    (clamped * 10.0).round() / 10.0
}
