//! Formatted terminal output for a run.
//!
//! We keep formatting code in one place so:
//! - the fitting code stays clean and testable
//! - output changes are localized (see the snapshot-style tests below)

use crate::domain::{CumulativePoint, SelectionOutcome};
use crate::fit::ModelSelection;
use crate::io::ingest::Series;
use crate::report::{SetpointSummary, summarize_setpoint};

/// Format the full run summary (dataset stats + candidate table + chosen model).
pub fn format_run_summary(series: &Series, selection: &ModelSelection) -> String {
    let mut out = String::new();

    out.push_str("=== setpoint - WBC setpoint fit ===\n");
    out.push_str(&format!("Source: {}\n", series.source.describe()));
    out.push_str(&format!(
        "Values: n={} | range=[{:.1}, {:.1}] | mean={:.2}\n",
        series.stats.n, series.stats.min, series.stats.max, series.stats.mean
    ));

    out.push('\n');
    out.push_str(&format_candidates(selection));

    out.push_str(&format!("\nOutcome: {}\n", selection.outcome.label()));

    let best = &selection.best.model;
    out.push_str(&format!("\nChosen model (k={}):\n", best.component_count));
    let dominant = best.dominant_component();
    out.push_str(&format!(
        "  {:<10} {:>8} {:>8} {:>8}\n",
        "component", "weight", "mean", "sd"
    ));
    for j in 0..best.component_count {
        let marker = if Some(j) == dominant { "*" } else { " " };
        out.push_str(&format!(
            "  {:<10} {:>8} {:>8} {:>8}\n",
            format!("{}{marker}", j + 1),
            fmt_num(best.weights[j], 3),
            fmt_num(best.means[j], 2),
            fmt_num(best.std_dev(j), 2),
        ));
    }

    out.push('\n');
    out.push_str(&format_setpoint(&summarize_setpoint(&series.values, &selection.best)));
    out
}

/// Candidate table (k, log-likelihood, BIC, max weight, constraint, iterations).
pub fn format_candidates(selection: &ModelSelection) -> String {
    let mut out = String::new();
    if selection.outcome == SelectionOutcome::Degenerate {
        out.push_str("Candidates: none (fewer than 5 values, sample statistics only)\n");
        return out;
    }

    out.push_str("Candidates:\n");
    out.push_str(&format!(
        "  {:<3} {:>10} {:>10} {:>7} {:>9} {:>5}\n",
        "k", "logL", "BIC", "max w", "dominant", "iter"
    ));
    let chosen_k = selection.best.model.component_count;
    for c in &selection.candidates {
        let mark = if c.model.component_count == chosen_k { "*" } else { " " };
        out.push_str(&format!(
            "{mark} {:<3} {:>10} {:>10} {:>7} {:>9} {:>5}\n",
            c.model.component_count,
            fmt_num(c.model.log_likelihood, 3),
            fmt_num(c.bic, 3),
            fmt_num(c.model.max_weight(), 3),
            if c.satisfies_dominance_constraint { "yes" } else { "no" },
            c.model.iterations,
        ));
    }
    out
}

fn format_setpoint(summary: &SetpointSummary) -> String {
    let mut out = format!(
        "Setpoint: {} (95% band {} .. {})\n",
        fmt_num(summary.setpoint, 2),
        fmt_num(summary.lower, 2),
        fmt_num(summary.upper, 2)
    );
    if !summary.excursions.is_empty() {
        let idx: Vec<String> = summary.excursions.iter().map(|i| i.to_string()).collect();
        out.push_str(&format!("Outside band: index {}\n", idx.join(", ")));
    }
    out
}

/// Trend table: one row per value, `-` where no trend point exists.
pub fn format_trend_table(values: &[f64], trend: &[Option<CumulativePoint>]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:>5} {:>7} {:>7} {:>7} {:>7} {:>2}\n",
        "index", "value", "mean", "lower", "upper", "k"
    ));
    out.push_str(&format!(
        "{:->5} {:->7} {:->7} {:->7} {:->7} {:->2}\n",
        "", "", "", "", "", ""
    ));
    for (i, v) in values.iter().enumerate() {
        let row = match trend.get(i).copied().flatten() {
            Some(p) => format!(
                "{:>5} {:>7.1} {:>7} {:>7} {:>7} {:>2}",
                i,
                v,
                fmt_num(p.mean, 2),
                fmt_num(p.lower, 2),
                fmt_num(p.upper, 2),
                p.components
            ),
            None => format!("{i:>5} {v:>7.1} {:>7} {:>7} {:>7} {:>2}", "-", "-", "-", "-"),
        };
        out.push_str(&row);
        out.push('\n');
    }
    out
}

fn fmt_num(v: f64, precision: usize) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else {
        format!("{v:.precision$}")
    }
}
