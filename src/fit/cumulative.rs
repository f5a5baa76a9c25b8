//! Rolling setpoint estimate over growing prefixes of a series.
//!
//! For index `i` the prefix `data[..=i]` is summarised independently:
//! - `i < 2`: no point
//! - prefix of 3 or 4 samples: sample mean and Bessel-corrected variance
//! - prefix of 5 or more: full model selection, dominant component
//!
//! and the point is `mean ± 1.96 σ`. A NaN variance drops the point.
//! Every prefix is refitted from scratch (no online update), so the cost is
//! quadratic in the series length; fine for tens of measurements.

use tracing::{debug, trace};

use crate::domain::{CumulativePoint, MixtureModel};
use crate::fit::em::{EmOptions, MIN_VARIANCE_SAMPLES};
use crate::fit::selection::{MIN_EM_SAMPLES, select_model_with_options};
use crate::math::{mean, sample_variance};

/// Two-sided 95% normal quantile.
pub const Z_95: f64 = 1.96;

/// Trend with default engine options.
pub fn cumulative_fit(data: &[f64]) -> Vec<Option<CumulativePoint>> {
    cumulative_fit_with_options(data, &EmOptions::default())
}

/// One entry per index of `data`.
pub fn cumulative_fit_with_options(data: &[f64], opts: &EmOptions) -> Vec<Option<CumulativePoint>> {
    let points: Vec<Option<CumulativePoint>> = (0..data.len())
        .map(|i| point_at(&data[..=i], i, opts))
        .collect();
    debug!(
        n = data.len(),
        present = points.iter().flatten().count(),
        "cumulative fit finished"
    );
    points
}

fn point_at(prefix: &[f64], index: usize, opts: &EmOptions) -> Option<CumulativePoint> {
    if prefix.len() < MIN_VARIANCE_SAMPLES {
        return None;
    }

    let (mu, variance, components) = if prefix.len() < MIN_EM_SAMPLES {
        (mean(prefix), sample_variance(prefix, MIN_VARIANCE_SAMPLES), 1)
    } else {
        let selection = select_model_with_options(prefix, opts);
        dominant_estimate(&selection.best.model)?
    };

    band_point(index, mu, variance, components)
}

/// The ±`Z_95`·σ band around `mu`; absent when the variance is undefined.
fn band_point(index: usize, mu: f64, variance: f64, components: usize) -> Option<CumulativePoint> {
    if variance.is_nan() {
        trace!(index, "undefined variance, no trend point");
        return None;
    }

    let half_width = Z_95 * variance.sqrt();
    Some(CumulativePoint {
        index,
        mean: mu,
        lower: mu - half_width,
        upper: mu + half_width,
        components,
    })
}

fn dominant_estimate(model: &MixtureModel) -> Option<(f64, f64, usize)> {
    let j = model.dominant_component()?;
    Some((model.means[j], model.variances[j], model.component_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::selection::select;

    #[test]
    fn first_two_indices_are_absent() {
        let trend = cumulative_fit(&[6.0, 6.4, 5.8, 6.1, 5.9, 6.3]);
        assert_eq!(trend.len(), 6);
        assert!(trend[0].is_none());
        assert!(trend[1].is_none());
        assert!(trend[2..].iter().all(Option::is_some));
    }

    #[test]
    fn three_samples_use_plain_statistics() {
        let trend = cumulative_fit(&[5.0, 6.0, 7.0]);
        let p = trend[2].unwrap();
        assert_eq!(p.index, 2);
        assert_eq!(p.components, 1);
        assert!((p.mean - 6.0).abs() < 1e-12);
        assert!((p.lower - (6.0 - 1.96)).abs() < 1e-12);
        assert!((p.upper - (6.0 + 1.96)).abs() < 1e-12);
    }

    #[test]
    fn long_prefixes_follow_the_selector() {
        let data = [
            4.8, 5.1, 5.3, 5.5, 5.7, 5.85, 6.0, 6.1, 6.2, 6.35, 6.5, 6.7, 6.9, 7.1, 5.95, 12.5,
            14.0, 16.0,
        ];
        let trend = cumulative_fit(&data);
        let last = trend[data.len() - 1].unwrap();

        let best = select(&data);
        let j = best.model.dominant_component().unwrap();
        assert_eq!(last.components, best.model.component_count);
        assert!((last.mean - best.model.means[j]).abs() < 1e-12);
        let half = Z_95 * best.model.variances[j].sqrt();
        assert!((last.upper - last.mean - half).abs() < 1e-12);
        assert!((last.mean - 6.0).abs() < 1.0);
    }

    #[test]
    fn band_is_ordered_around_the_mean() {
        let data = [6.1, 5.7, 6.4, 5.9, 6.0, 6.6, 5.5, 6.2, 13.0, 6.3, 5.8];
        for p in cumulative_fit(&data).into_iter().flatten() {
            assert!(p.lower <= p.mean && p.mean <= p.upper, "{p:?}");
        }
    }

    #[test]
    fn constant_series_gives_a_zero_width_band() {
        // The k=1 model collapses to zero variance (its BIC is NaN but it is
        // still the first dominant candidate), so the band has no width.
        let trend = cumulative_fit(&[5.0, 5.0, 5.0, 5.0, 5.0]);
        let p = trend[4].unwrap();
        assert!((p.mean - 5.0).abs() < 1e-12);
        assert_eq!(p.lower, p.upper);
    }

    #[test]
    fn nan_variance_from_the_selector_drops_the_point() {
        // Collapsed candidates can leave the dominant component with NaN variance.
        let mut model = select(&[6.1, 5.7, 6.4, 5.9, 6.0]).model;
        model.variances.iter_mut().for_each(|v| *v = f64::NAN);
        let (mu, variance, components) = dominant_estimate(&model).unwrap();
        assert!(band_point(4, mu, variance, components).is_none());

        let p = band_point(4, 6.0, 0.25, 2).unwrap();
        assert_eq!(p.index, 4);
        assert_eq!(p.components, 2);
        assert!((p.upper - (6.0 + Z_95 * 0.5)).abs() < 1e-12);
    }

    #[test]
    fn short_prefix_has_no_point() {
        assert!(point_at(&[5.0, 5.0], 1, &EmOptions::default()).is_none());
        assert!(point_at(&[5.0], 0, &EmOptions::default()).is_none());
    }
}
