//! Univariate Gaussian mixture fitting by expectation-maximization.
//!
//! Given:
//! - samples `x_i` (positive measurements, order irrelevant here)
//! - a component count `k`
//!
//! we seed the means at evenly spaced order statistics, start every variance
//! at 1.0 and every weight at `1/k`, then alternate:
//! - E-step: `r_ij = w_j N(x_i; μ_j, σ_j) / (Σ_j' w_j' N(x_i; μ_j', σ_j') + ε)`
//! - M-step: `w_j = n_j / n`, `μ_j = Σ r_ij x_i / n_j`, `σ²_j = Σ r_ij (x_i - μ_j)² / n_j`
//!
//! until the log-likelihood moves by less than `tol` or `max_iter` passes.
//!
//! Nothing here returns an error. A component that loses all responsibility,
//! or shrinks onto duplicated samples, yields NaN/zero parameters and a NaN
//! log-likelihood; the loop stops at the first non-finite log-likelihood and
//! hands that model back as-is. `CollapsePolicy::Reseed` is the opt-in
//! alternative that re-seeds such components instead.

use tracing::{debug, trace, warn};

use crate::domain::{CollapsePolicy, MixtureModel};
use crate::math::{gaussian_pdf, mean, sample_variance};
use crate::models::mixture_density;

/// Default EM iteration cap.
pub const MAX_ITER: usize = 100;

/// Default convergence tolerance on the log-likelihood delta.
pub const TOLERANCE: f64 = 1e-3;

/// Added to E-step row sums and to every density inside the log-likelihood.
pub const EPSILON: f64 = 1e-10;

/// Below this many samples a variance is reported as undefined.
pub const MIN_VARIANCE_SAMPLES: usize = 3;

/// Engine settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmOptions {
    pub max_iter: usize,
    pub tol: f64,
    pub collapse: CollapsePolicy,
}

impl Default for EmOptions {
    fn default() -> Self {
        Self {
            max_iter: MAX_ITER,
            tol: TOLERANCE,
            collapse: CollapsePolicy::Propagate,
        }
    }
}

/// Working parameters, index-aligned per component.
#[derive(Debug, Clone)]
struct Components {
    means: Vec<f64>,
    variances: Vec<f64>,
    weights: Vec<f64>,
}

impl Components {
    fn len(&self) -> usize {
        self.means.len()
    }

    fn weighted_pdf(&self, j: usize, x: f64) -> f64 {
        self.weights[j] * gaussian_pdf(x, self.means[j], self.variances[j].sqrt())
    }

    fn log_likelihood(&self, data: &[f64]) -> f64 {
        data.iter()
            .map(|&x| {
                let p: f64 = (0..self.len()).map(|j| self.weighted_pdf(j, x)).sum();
                (p + EPSILON).ln()
            })
            .sum()
    }
}

/// Fit a `k`-component mixture with the default options.
pub fn fit(data: &[f64], k: usize) -> MixtureModel {
    fit_with_options(data, k, &EmOptions::default())
}

/// Fit a `k`-component mixture.
///
/// Callers are expected to pass at least one sample and a sensible `k`; there
/// is no check that `k <= data.len()`.
pub fn fit_with_options(data: &[f64], k: usize, opts: &EmOptions) -> MixtureModel {
    let n = data.len();
    let k = k.max(1);

    let mut params = Components {
        means: seed_means(data, k),
        variances: vec![1.0; k],
        weights: vec![1.0 / k as f64; k],
    };
    let mut resp = vec![vec![0.0; k]; n];
    let mut effective = vec![0.0; k];

    let mut prev_ll = f64::NEG_INFINITY;
    let mut ll = f64::NAN;
    let mut iterations = 0;
    let mut converged = false;

    for iter in 0..opts.max_iter {
        iterations = iter + 1;

        e_step(data, &params, &mut resp);
        m_step(data, &resp, &mut params, &mut effective);
        if opts.collapse == CollapsePolicy::Reseed {
            reseed_collapsed(data, &mut params, &effective);
        }

        ll = params.log_likelihood(data);
        trace!(k, iter = iterations, ll, "em iteration");

        if !ll.is_finite() {
            debug!(k, iter = iterations, "non-finite log-likelihood, stopping EM");
            break;
        }
        if (ll - prev_ll).abs() < opts.tol {
            converged = true;
            break;
        }
        prev_ll = ll;
    }

    debug!(k, n, iterations, converged, ll, "em finished");

    MixtureModel {
        component_count: k,
        means: params.means,
        variances: params.variances,
        weights: params.weights,
        is_degenerate: false,
        log_likelihood: ll,
        iterations,
        converged,
    }
}

/// Small-sample stand-in for EM: one component at the sample mean.
///
/// The variance is Bessel-corrected and left as NaN below
/// [`MIN_VARIANCE_SAMPLES`]. Nothing is iterated or scored.
pub fn degenerate_fit(data: &[f64]) -> MixtureModel {
    MixtureModel {
        component_count: 1,
        means: vec![mean(data)],
        variances: vec![sample_variance(data, MIN_VARIANCE_SAMPLES)],
        weights: vec![1.0],
        is_degenerate: true,
        log_likelihood: f64::NAN,
        iterations: 0,
        converged: false,
    }
}

/// Log-likelihood of `data` under a fitted model (with the same ε guard EM uses).
pub fn log_likelihood(data: &[f64], model: &MixtureModel) -> f64 {
    data.iter()
        .map(|&x| (mixture_density(model, x) + EPSILON).ln())
        .sum()
}

/// Initial means: the order statistic at `floor((j + 1) n / (k + 1))` for each `j`.
///
/// For `k = 1` that is the median element, for `k = 2` the 1/3 and 2/3
/// order statistics.
pub fn seed_means(data: &[f64], k: usize) -> Vec<f64> {
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    (0..k)
        .map(|j| {
            let idx = (j + 1) * n / (k + 1);
            sorted.get(idx).copied().unwrap_or(f64::NAN)
        })
        .collect()
}

fn e_step(data: &[f64], params: &Components, resp: &mut [Vec<f64>]) {
    for (row, &x) in resp.iter_mut().zip(data) {
        for (j, r) in row.iter_mut().enumerate() {
            *r = params.weighted_pdf(j, x);
        }
        let total: f64 = row.iter().sum();
        for r in row.iter_mut() {
            *r /= total + EPSILON;
        }
    }
}

fn m_step(data: &[f64], resp: &[Vec<f64>], params: &mut Components, effective: &mut [f64]) {
    let n = data.len() as f64;
    for j in 0..params.len() {
        let n_j: f64 = resp.iter().map(|r| r[j]).sum();
        effective[j] = n_j;
        params.weights[j] = n_j / n;

        let mu = resp.iter().zip(data).map(|(r, &x)| r[j] * x).sum::<f64>() / n_j;
        params.means[j] = mu;

        let var = resp
            .iter()
            .zip(data)
            .map(|(r, &x)| r[j] * ((x - mu) * (x - mu)))
            .sum::<f64>()
            / n_j;
        params.variances[j] = var;
    }
}

fn is_collapsed(params: &Components, effective: &[f64], j: usize) -> bool {
    let var = params.variances[j];
    !(effective[j] > 0.0 && params.means[j].is_finite() && var.is_finite() && var > 0.0)
}

/// Re-seed collapsed components at the sample the healthy ones explain worst.
///
/// The new variance is the pooled sample variance (1.0 if that is not
/// positive); a non-finite or zero weight becomes `1/n`.
fn reseed_collapsed(data: &[f64], params: &mut Components, effective: &[f64]) {
    let k = params.len();
    let collapsed: Vec<usize> = (0..k).filter(|&j| is_collapsed(params, effective, j)).collect();
    if collapsed.is_empty() || data.is_empty() {
        return;
    }

    let mut healthy: Vec<usize> = (0..k).filter(|j| !collapsed.contains(j)).collect();
    let pooled = sample_variance(data, 2);
    let pooled = if pooled.is_finite() && pooled > 0.0 { pooled } else { 1.0 };

    for &j in &collapsed {
        let anchor = if healthy.is_empty() {
            seed_means(data, 1)[0]
        } else {
            least_explained(data, params, &healthy)
        };
        warn!(component = j, anchor, "re-seeding collapsed mixture component");

        params.means[j] = anchor;
        params.variances[j] = pooled;
        if !(params.weights[j].is_finite() && params.weights[j] > 0.0) {
            params.weights[j] = 1.0 / data.len() as f64;
        }
        healthy.push(j);
    }
}

fn least_explained(data: &[f64], params: &Components, healthy: &[usize]) -> f64 {
    let mut worst = data[0];
    let mut worst_density = f64::INFINITY;
    for &x in data {
        let density: f64 = healthy.iter().map(|&h| params.weighted_pdf(h, x)).sum();
        if density < worst_density {
            worst = x;
            worst_density = density;
        }
    }
    worst
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_clusters() -> Vec<f64> {
        vec![
            5.3, 5.5, 5.65, 5.8, 5.9, 6.0, 6.05, 6.1, 6.2, 6.3, //
            13.3, 13.5, 13.65, 13.8, 13.9, 14.0, 14.05, 14.1, 14.2, 14.3,
        ]
    }

    fn assert_shapes(model: &MixtureModel) {
        assert_eq!(model.means.len(), model.component_count);
        assert_eq!(model.variances.len(), model.component_count);
        assert_eq!(model.weights.len(), model.component_count);
    }

    #[test]
    fn seeds_use_order_statistics() {
        let data = [9.0, 1.0, 7.0, 3.0, 5.0, 8.0];
        // sorted: 1 3 5 7 8 9
        assert_eq!(seed_means(&data, 1), vec![7.0]);
        assert_eq!(seed_means(&data, 2), vec![5.0, 8.0]);
        assert_eq!(seed_means(&data, 3), vec![3.0, 7.0, 8.0]);
    }

    #[test]
    fn constant_series_converges_to_the_value() {
        let model = fit(&[5.0, 5.0, 5.0, 5.0, 5.0], 1);
        assert_shapes(&model);
        assert!((model.means[0] - 5.0).abs() < 1e-12);
        assert_eq!(model.variances[0], 0.0);
        assert!((model.weights[0] - 1.0).abs() < 1e-6);
        assert!(!model.converged);
        assert!(!model.is_degenerate);
    }

    #[test]
    fn separates_two_clusters() {
        let model = fit(&two_clusters(), 2);
        assert_shapes(&model);
        assert!((model.means[0] - 5.88).abs() < 0.05, "means={:?}", model.means);
        assert!((model.means[1] - 13.88).abs() < 0.05, "means={:?}", model.means);
        assert!((model.weights[0] - 0.5).abs() < 1e-6);
        assert!((model.weights[1] - 0.5).abs() < 1e-6);
        assert!(model.converged);
        assert!(model.iterations <= MAX_ITER);
    }

    #[test]
    fn weights_sum_to_one_when_every_sample_is_explained() {
        let data = [5.1, 6.4, 5.8, 7.2, 6.0, 5.5, 6.9, 6.2, 5.9, 6.6, 12.5, 14.0, 16.0];
        for k in 1..=3 {
            let model = fit(&data, k);
            assert_shapes(&model);
            let total: f64 = model.weights.iter().sum();
            assert!((total - 1.0).abs() < 1e-6, "k={k} total={total}");
            let normalized: f64 = model.normalized_weights().iter().sum();
            assert!((normalized - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn orphaned_samples_leave_raw_weights_short_of_one() {
        // The median seed sits in the middle cluster and the outer clusters
        // are too far away to receive responsibility.
        let data = [
            1.8, 1.9, 2.0, 2.1, 2.2, 9.8, 9.9, 10.0, 10.1, 10.2, 17.8, 17.9, 18.0, 18.1, 18.2,
        ];
        let model = fit(&data, 1);
        assert!((model.weights[0] - 1.0 / 3.0).abs() < 1e-3, "w={:?}", model.weights);
        assert!((model.normalized_weights()[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn fit_is_deterministic() {
        let data = two_clusters();
        for k in 1..=3 {
            assert_eq!(fit(&data, k), fit(&data, k));
        }
    }

    #[test]
    fn reported_log_likelihood_matches_model() {
        let data = two_clusters();
        let model = fit(&data, 2);
        let recomputed = log_likelihood(&data, &model);
        assert!((recomputed - model.log_likelihood).abs() < 1e-9);
    }

    #[test]
    fn respects_iteration_cap() {
        let opts = EmOptions {
            max_iter: 1,
            ..EmOptions::default()
        };
        let model = fit_with_options(&two_clusters(), 2, &opts);
        assert_eq!(model.iterations, 1);
        assert!(!model.converged);
    }

    #[test]
    fn duplicate_cluster_collapses_under_default_policy() {
        let data = [4.0, 4.0, 4.0, 4.0, 4.0, 4.0, 4.0, 8.0, 12.0, 12.5, 13.0];
        let model = fit(&data, 2);
        assert_eq!(model.variances[0], 0.0);
        assert!(model.log_likelihood.is_nan());
        assert!(!model.converged);
    }

    #[test]
    fn reseed_policy_keeps_parameters_finite() {
        let data = [4.0, 4.0, 4.0, 4.0, 4.0, 4.0, 4.0, 8.0, 12.0, 12.5, 13.0];
        let opts = EmOptions {
            collapse: CollapsePolicy::Reseed,
            ..EmOptions::default()
        };
        for k in 1..=3 {
            let model = fit_with_options(&data, k, &opts);
            assert_shapes(&model);
            assert!(model.log_likelihood.is_finite(), "k={k}");
            for &v in &model.variances {
                assert!(v.is_finite() && v > 0.0, "k={k} variances={:?}", model.variances);
            }
        }
    }

    #[test]
    fn reseed_covers_zero_variance_and_keeps_positive_weights() {
        let data = [4.0, 4.0, 6.0, 8.0];
        let mut params = Components {
            means: vec![4.0, f64::NAN, 6.0],
            variances: vec![0.0, f64::NAN, 1.0],
            weights: vec![0.5, 0.0, 0.5],
        };
        let effective = [2.0, 0.0, 2.0];
        assert!(is_collapsed(&params, &effective, 0));
        assert!(is_collapsed(&params, &effective, 1));
        assert!(!is_collapsed(&params, &effective, 2));

        reseed_collapsed(&data, &mut params, &effective);
        let pooled = 11.0 / 3.0;
        assert!((params.variances[0] - pooled).abs() < 1e-12);
        assert!((params.variances[1] - pooled).abs() < 1e-12);
        assert_eq!(params.weights[0], 0.5);
        assert_eq!(params.weights[1], 0.25);
        assert_eq!(params.variances[2], 1.0);
        assert!(params.means.iter().all(|m| m.is_finite()));
    }

    #[test]
    fn degenerate_fit_uses_sample_statistics() {
        let two = degenerate_fit(&[4.0, 8.0]);
        assert_eq!(two.component_count, 1);
        assert!((two.means[0] - 6.0).abs() < 1e-12);
        assert!(two.variances[0].is_nan());
        assert_eq!(two.weights, vec![1.0]);
        assert!(two.is_degenerate);

        let four = degenerate_fit(&[4.0, 6.0, 8.0, 10.0]);
        assert!((four.means[0] - 7.0).abs() < 1e-12);
        assert!((four.variances[0] - 20.0 / 3.0).abs() < 1e-12);
    }
}
