//! Density evaluation for a fitted mixture.
//!
//! The fitters and renderers rely on two primitive operations:
//! - the weighted density of one component at `x`
//! - the total mixture density at `x`
//!
//! plus a convenience that samples both over a regular grid for plotting.

use crate::domain::{DensityCurve, MixtureModel};
use crate::math::{finite_range, gaussian_pdf, linspace};

/// Default number of grid points for density curves.
pub const DEFAULT_CURVE_STEPS: usize = 200;

/// Margin added either side of the data range when plotting densities.
const RANGE_PAD: f64 = 2.0;

/// `weight_j * pdf(x; mean_j, sigma_j)`.
pub fn component_density(model: &MixtureModel, component: usize, x: f64) -> f64 {
    model.weights[component] * gaussian_pdf(x, model.means[component], model.std_dev(component))
}

/// `Σ_j weight_j * pdf(x; mean_j, sigma_j)`.
pub fn mixture_density(model: &MixtureModel, x: f64) -> f64 {
    (0..model.component_count)
        .map(|j| component_density(model, j, x))
        .sum()
}

/// Sample every component and the total on `steps` points in `[x_min, x_max]`.
pub fn density_curve(model: &MixtureModel, x_min: f64, x_max: f64, steps: usize) -> DensityCurve {
    let x = linspace(x_min, x_max, steps);
    let components: Vec<Vec<f64>> = (0..model.component_count)
        .map(|j| x.iter().map(|&xi| component_density(model, j, xi)).collect())
        .collect();
    let total = x.iter().map(|&xi| mixture_density(model, xi)).collect();
    DensityCurve { x, components, total }
}

/// Plot range for a dataset: `[min - 2, max + 2]`, never below zero.
pub fn plot_range(data: &[f64]) -> (f64, f64) {
    match finite_range(data) {
        Some((lo, hi)) => ((lo - RANGE_PAD).max(0.0), hi + RANGE_PAD),
        None => (0.0, 1.0),
    }
}
