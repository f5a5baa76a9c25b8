//! Model selection (k = 1, 2, 3) using BIC with a dominance guardrail.
//!
//! The tool fits each candidate component count and computes:
//! - log-likelihood (from the engine)
//! - BIC = -2 ln L + p ln(n), with p = k means + k variances + (k - 1) weights
//!
//! Selection rules:
//! 1. Fewer than 5 samples: skip EM, return the degenerate sample-statistics model
//! 2. Keep candidates whose largest weight is >= 0.5 (one population dominates)
//! 3. Choose the kept candidate with minimum BIC, earliest wins ties
//! 4. If nothing is kept, return the k = 1 fit regardless

use tracing::debug;

use crate::domain::{MixtureModel, ScoredModel, SelectionOutcome};
use crate::fit::em::{EmOptions, degenerate_fit, fit_with_options};

/// Minimum sample count for running EM at all.
pub const MIN_EM_SAMPLES: usize = 5;

/// Component counts tried, in evaluation order.
pub const CANDIDATE_COMPONENTS: [usize; 3] = [1, 2, 3];

/// A candidate is acceptable when some component carries at least this weight.
pub const DOMINANCE_THRESHOLD: f64 = 0.5;

/// Output of fitting + selection.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSelection {
    pub best: ScoredModel,
    /// Every scored candidate in evaluation order (empty when degenerate).
    pub candidates: Vec<ScoredModel>,
    pub outcome: SelectionOutcome,
}

/// Free parameters of a `k`-component univariate mixture: `3k - 1`.
pub fn param_count(k: usize) -> usize {
    2 * k + k.saturating_sub(1)
}

/// Bayesian information criterion.
pub fn bic(log_likelihood: f64, k: usize, n: usize) -> f64 {
    -2.0 * log_likelihood + param_count(k) as f64 * (n as f64).ln()
}

/// `max(weights) >= 0.5`; false when every weight is NaN.
pub fn satisfies_dominance(model: &MixtureModel) -> bool {
    model.max_weight() >= DOMINANCE_THRESHOLD
}

/// Attach BIC and the dominance flag to a fitted model.
pub fn score(model: MixtureModel, n: usize) -> ScoredModel {
    let bic = bic(model.log_likelihood, model.component_count, n);
    let satisfies_dominance_constraint = satisfies_dominance(&model);
    ScoredModel {
        model,
        bic,
        satisfies_dominance_constraint,
    }
}

/// Select the best model with default engine options.
pub fn select(data: &[f64]) -> ScoredModel {
    select_model(data).best
}

/// Fit every candidate and select one.
pub fn select_model(data: &[f64]) -> ModelSelection {
    select_model_with_options(data, &EmOptions::default())
}

/// Fit every candidate with the given engine options and select one.
pub fn select_model_with_options(data: &[f64], opts: &EmOptions) -> ModelSelection {
    let n = data.len();
    if n < MIN_EM_SAMPLES {
        let model = degenerate_fit(data);
        debug!(n, "too few samples for EM, using sample statistics");
        let satisfies_dominance_constraint = satisfies_dominance(&model);
        return ModelSelection {
            best: ScoredModel {
                model,
                bic: f64::NAN,
                satisfies_dominance_constraint,
            },
            candidates: Vec::new(),
            outcome: SelectionOutcome::Degenerate,
        };
    }

    let candidates: Vec<ScoredModel> = CANDIDATE_COMPONENTS
        .iter()
        .map(|&k| score(fit_with_options(data, k, opts), n))
        .collect();

    for c in &candidates {
        debug!(
            k = c.model.component_count,
            bic = c.bic,
            max_weight = c.model.max_weight(),
            dominant = c.satisfies_dominance_constraint,
            "scored candidate"
        );
    }

    let (best, outcome) = match select_by_bic(&candidates) {
        Some(best) => (best.clone(), SelectionOutcome::Constrained),
        None => (candidates[0].clone(), SelectionOutcome::Fallback),
    };
    debug!(k = best.model.component_count, ?outcome, "selected model");

    ModelSelection {
        best,
        candidates,
        outcome,
    }
}

/// Minimum BIC among candidates passing the dominance constraint.
///
/// Strict `<`, so the earliest candidate wins ties.
fn select_by_bic(candidates: &[ScoredModel]) -> Option<&ScoredModel> {
    let mut best: Option<&ScoredModel> = None;
    for c in candidates.iter().filter(|c| c.satisfies_dominance_constraint) {
        match best {
            Some(b) if !(c.bic < b.bic) => {}
            _ => best = Some(c),
        }
    }
    best
}
