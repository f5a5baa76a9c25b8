//! Debug bundle writer for inspecting every candidate fit and every prefix.

use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use crate::domain::{CollapsePolicy, ScoredModel};
use crate::error::AppError;
use crate::fit::{EmOptions, MIN_EM_SAMPLES, ModelSelection, cumulative_fit_with_options, select_model_with_options};
use crate::io::ingest::Series;

/// Write a markdown bundle into `dir` and return its path.
pub fn write_debug_bundle(dir: &Path, series: &Series, collapse: CollapsePolicy) -> Result<PathBuf, AppError> {
    create_dir_all(dir).map_err(|e| AppError::runtime(format!("Failed to create debug dir: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("setpoint_debug_n{}_{}.md", series.values.len(), ts));

    let mut file = File::create(&path)
        .map_err(|e| AppError::runtime(format!("Failed to create debug file: {e}")))?;
    file.write_all(render_debug_markdown(series, collapse).as_bytes())
        .map_err(|e| AppError::runtime(format!("Failed to write debug: {e}")))?;

    info!(path = %path.display(), "wrote debug bundle");
    Ok(path)
}

/// The bundle contents: inputs, the full-series candidates, then the
/// candidates behind every cumulative trend point.
pub fn render_debug_markdown(series: &Series, collapse: CollapsePolicy) -> String {
    let opts = EmOptions {
        collapse,
        ..EmOptions::default()
    };
    let mut out = String::new();

    out.push_str("# setpoint debug bundle\n");
    out.push_str(&format!("- generated: {}\n", Local::now().to_rfc3339()));
    out.push_str(&format!("- source: {}\n", series.source.describe()));
    out.push_str(&format!("- n: {}\n", series.values.len()));
    out.push_str(&format!(
        "- engine: max_iter={}, tol={}, collapse={:?}\n",
        opts.max_iter, opts.tol, opts.collapse
    ));

    out.push_str("\n## Values\n");
    out.push_str("| index | value |\n| - | - |\n");
    for (i, v) in series.values.iter().enumerate() {
        out.push_str(&format!("| {i} | {v:.1} |\n"));
    }

    out.push_str("\n## Full series\n");
    let selection = select_model_with_options(&series.values, &opts);
    push_selection(&mut out, &selection);

    out.push_str("\n## Prefixes\n");
    let trend = cumulative_fit_with_options(&series.values, &opts);
    for (i, point) in trend.iter().enumerate() {
        let prefix = &series.values[..=i];
        out.push_str(&format!("\n### prefix n={}\n", prefix.len()));
        match point {
            Some(p) => out.push_str(&format!(
                "trend: mean={} band=[{}, {}] k={}\n",
                fmt_num(p.mean),
                fmt_num(p.lower),
                fmt_num(p.upper),
                p.components
            )),
            None => out.push_str("trend: absent\n"),
        }
        if prefix.len() >= MIN_EM_SAMPLES {
            push_selection(&mut out, &select_model_with_options(prefix, &opts));
        }
    }

    out
}

fn push_selection(out: &mut String, selection: &ModelSelection) {
    out.push_str(&format!("outcome: {:?}\n\n", selection.outcome));
    out.push_str("| k | chosen | logL | bic | dominant | iter | converged | means | variances | weights |\n");
    out.push_str("| - | - | - | - | - | - | - | - | - | - |\n");
    let rows: Vec<&ScoredModel> = if selection.candidates.is_empty() {
        vec![&selection.best]
    } else {
        selection.candidates.iter().collect()
    };
    for c in rows {
        let chosen = c.model.component_count == selection.best.model.component_count;
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} | {} | {} | {} |\n",
            c.model.component_count,
            if chosen { "*" } else { "" },
            fmt_num(c.model.log_likelihood),
            fmt_num(c.bic),
            c.satisfies_dominance_constraint,
            c.model.iterations,
            c.model.converged,
            fmt_vec(&c.model.means),
            fmt_vec(&c.model.variances),
            fmt_vec(&c.model.weights),
        ));
    }
}

fn fmt_vec(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|&v| fmt_num(v)).collect();
    format!("[{}]", parts.join(", "))
}

fn fmt_num(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.6}")
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ingest::SeriesSource;

    #[test]
    fn bundle_covers_every_prefix() {
        let values = vec![6.0, 5.8, 6.3, 6.1, 5.9, 13.5];
        let series = Series::new(values, SeriesSource::Input).unwrap();
        let md = render_debug_markdown(&series, CollapsePolicy::Propagate);

        assert!(md.starts_with("# setpoint debug bundle\n"));
        for n in 1..=6 {
            assert!(md.contains(&format!("### prefix n={n}\n")));
        }
        assert_eq!(md.matches("trend: absent").count(), 2);
        // Full series plus prefixes of length 5 and 6.
        assert_eq!(md.matches("| - | - | - | - | - | - | - | - | - | - |").count(), 3);
    }

    #[test]
    fn writes_bundle_file() {
        let dir = std::env::temp_dir().join(format!("wbc_setpoint_debug_{}", std::process::id()));
        let series = Series::new(vec![6.0, 6.2, 5.9], SeriesSource::Input).unwrap();
        let path = write_debug_bundle(&dir, &series, CollapsePolicy::Reseed).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_dir_all(&dir);
        assert!(text.contains("collapse=Reseed"));
    }
}
