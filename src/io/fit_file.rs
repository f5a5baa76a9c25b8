//! Read/write fit JSON files.
//!
//! Fit JSON is the "portable" representation of one run:
//! - the values that were fitted, in order
//! - the selected model and every scored candidate
//! - a precomputed density grid and the cumulative trend, for quick plotting
//!
//! The schema is defined by `domain::FitFile`. Non-finite numbers are written
//! as `null` and read back as NaN.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::Utc;

use crate::domain::{CumulativePoint, DensityCurve, FitFile};
use crate::error::AppError;
use crate::fit::ModelSelection;

pub const TOOL_NAME: &str = "setpoint";

/// Assemble the on-disk representation of a run.
pub fn build_fit_file(
    values: &[f64],
    selection: &ModelSelection,
    density: &DensityCurve,
    trend: &[Option<CumulativePoint>],
) -> FitFile {
    FitFile {
        tool: TOOL_NAME.to_string(),
        generated_at: Utc::now(),
        values: values.to_vec(),
        outcome: selection.outcome,
        best: selection.best.clone(),
        candidates: selection.candidates.clone(),
        density: density.clone(),
        trend: trend.to_vec(),
    }
}

/// Write a fit JSON file.
pub fn write_fit_json(path: &Path, fit: &FitFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::runtime(format!("Failed to create fit JSON '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, fit)
        .map_err(|e| AppError::runtime(format!("Failed to write fit JSON: {e}")))?;
    out.flush()
        .map_err(|e| AppError::runtime(format!("Failed to write fit JSON: {e}")))
}

/// Read a fit JSON file.
pub fn read_fit_json(path: &Path) -> Result<FitFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::runtime(format!("Failed to open fit JSON '{}': {e}", path.display())))?;
    let fit: FitFile = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::invalid_input(format!("Invalid fit JSON: {e}")))?;
    Ok(fit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::{cumulative_fit, select_model};
    use crate::models::density_curve;

    #[test]
    fn saved_fit_reads_back_with_nan_fields() {
        // Constant prefix: the k=1 candidate collapses and carries a NaN BIC.
        let values = vec![5.0, 5.0, 5.0, 5.0, 5.0, 5.0];
        let selection = select_model(&values);
        let density = density_curve(&selection.best.model, 3.0, 7.0, 11);
        let trend = cumulative_fit(&values);
        let fit = build_fit_file(&values, &selection, &density, &trend);

        let path = std::env::temp_dir().join(format!("wbc_setpoint_fit_{}.json", std::process::id()));
        write_fit_json(&path, &fit).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let back = read_fit_json(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert!(text.contains("null"));
        assert_eq!(back.tool, TOOL_NAME);
        assert_eq!(back.values, values);
        assert_eq!(back.outcome, selection.outcome);
        assert_eq!(back.candidates.len(), selection.candidates.len());
        assert!(back.best.bic.is_nan());
        assert_eq!(back.trend.len(), values.len());
        assert!(back.trend[0].is_none());
        assert_eq!(back.density.x.len(), 11);
    }

    #[test]
    fn missing_file_is_a_runtime_failure() {
        let err = read_fit_json(Path::new("/nonexistent/setpoint-fit.json")).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_RUNTIME);
    }

    #[test]
    fn malformed_json_is_invalid_input() {
        let path = std::env::temp_dir().join(format!("wbc_setpoint_bad_fit_{}.json", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();
        let err = read_fit_json(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert_eq!(err.exit_code(), crate::error::EXIT_INVALID_INPUT);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn buffered_write_failure_is_reported() {
        // A small document stays in the buffer, so the error only shows on flush.
        let values = vec![6.0];
        let selection = select_model(&values);
        let density = density_curve(&selection.best.model, 5.0, 7.0, 3);
        let fit = build_fit_file(&values, &selection, &density, &cumulative_fit(&values));

        let err = write_fit_json(Path::new("/dev/full"), &fit).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_RUNTIME);
    }
}
