//! Reporting utilities: setpoint summary, excursion flags and formatted output.

pub mod format;

pub use format::*;

use crate::domain::{CumulativePoint, ScoredModel};

/// Headline numbers of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct SetpointSummary {
    /// Dominant component of the selected model.
    pub component: Option<usize>,
    pub setpoint: f64,
    pub lower: f64,
    pub upper: f64,
    /// Indices of values outside the final band.
    pub excursions: Vec<usize>,
}

/// Summarise the selected model: dominant mean, its 95% band, and the values
/// that fall outside it.
pub fn summarize_setpoint(values: &[f64], best: &ScoredModel) -> SetpointSummary {
    let component = best.model.dominant_component();
    let (setpoint, sd) = component
        .map(|j| (best.model.means[j], best.model.std_dev(j)))
        .unwrap_or((f64::NAN, f64::NAN));
    let half_width = crate::fit::Z_95 * sd;
    let lower = setpoint - half_width;
    let upper = setpoint + half_width;

    let excursions = if lower.is_finite() && upper.is_finite() {
        values
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v < lower || v > upper)
            .map(|(i, _)| i)
            .collect()
    } else {
        Vec::new()
    };

    SetpointSummary {
        component,
        setpoint,
        lower,
        upper,
        excursions,
    }
}

/// Last index that has a trend point.
pub fn latest_trend_point(trend: &[Option<CumulativePoint>]) -> Option<CumulativePoint> {
    trend.iter().rev().find_map(|p| *p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MixtureModel;

    fn scored(means: Vec<f64>, variances: Vec<f64>, weights: Vec<f64>) -> ScoredModel {
        ScoredModel {
            model: MixtureModel {
                component_count: means.len(),
                means,
                variances,
                weights,
                is_degenerate: false,
                log_likelihood: -10.0,
                iterations: 5,
                converged: true,
            },
            bic: 25.0,
            satisfies_dominance_constraint: true,
        }
    }

    #[test]
    fn setpoint_uses_dominant_component() {
        let best = scored(vec![14.0, 6.0], vec![4.0, 1.0], vec![0.2, 0.8]);
        let summary = summarize_setpoint(&[6.0, 5.5, 14.0, 7.0, 3.5], &best);
        assert_eq!(summary.component, Some(1));
        assert_eq!(summary.setpoint, 6.0);
        assert!((summary.lower - 4.04).abs() < 1e-12);
        assert!((summary.upper - 7.96).abs() < 1e-12);
        assert_eq!(summary.excursions, vec![2, 4]);
    }

    #[test]
    fn undefined_variance_flags_nothing() {
        let best = scored(vec![6.0], vec![f64::NAN], vec![1.0]);
        let summary = summarize_setpoint(&[6.0, 20.0], &best);
        assert!(summary.lower.is_nan());
        assert!(summary.excursions.is_empty());
    }

    #[test]
    fn latest_point_skips_absent_tail() {
        let p = CumulativePoint {
            index: 2,
            mean: 6.0,
            lower: 5.0,
            upper: 7.0,
            components: 1,
        };
        assert_eq!(latest_trend_point(&[None, None, Some(p), None]), Some(p));
        assert_eq!(latest_trend_point(&[None, None]), None);
    }
}
