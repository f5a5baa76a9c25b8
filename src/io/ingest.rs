//! Measurement ingest and validation.
//!
//! This module is responsible for turning user text (a comma-separated list
//! typed at the prompt, or a file of the same) into a clean series of values
//! that are safe to fit.
//!
//! Design goals:
//! - **Strict**: any non-numeric token or out-of-range value rejects the whole
//!   input with a message naming the token (exit code 2)
//! - **Order-preserving**: the series order drives the cumulative trend
//! - **Separation of concerns**: no fitting logic here; the fitters trust
//!   whatever this module lets through

use std::fs;
use std::path::Path;

use crate::domain::ValueDomain;
use crate::error::AppError;
use crate::math::{finite_range, mean};

/// Where a series came from.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesSource {
    Input,
    File(String),
    Synthetic { preset: String, seed: u64 },
}

impl SeriesSource {
    pub fn describe(&self) -> String {
        match self {
            SeriesSource::Input => "input".to_string(),
            SeriesSource::File(path) => format!("file {path}"),
            SeriesSource::Synthetic { preset, seed } => format!("synthetic ({preset}, seed {seed})"),
        }
    }
}

/// Summary stats about the values actually used for fitting.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetStats {
    pub n: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl DatasetStats {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let (min, max) = finite_range(values)?;
        Some(Self {
            n: values.len(),
            min,
            max,
            mean: mean(values),
        })
    }
}

/// A validated, ordered measurement series.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub values: Vec<f64>,
    pub source: SeriesSource,
    pub stats: DatasetStats,
}

impl Series {
    pub fn new(values: Vec<f64>, source: SeriesSource) -> Result<Self, AppError> {
        let stats = DatasetStats::from_values(&values)
            .ok_or_else(|| AppError::invalid_input("Please enter at least one value."))?;
        Ok(Self {
            values,
            source,
            stats,
        })
    }
}

/// Parse comma (or whitespace) separated values and check them against `domain`.
///
/// Empty tokens are skipped, so trailing commas and blank lines are harmless.
pub fn parse_values(text: &str, domain: &ValueDomain) -> Result<Vec<f64>, AppError> {
    let mut values = Vec::new();
    let tokens = text
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|t| !t.is_empty());

    for (pos, token) in tokens.enumerate() {
        let value: f64 = token.parse().map_err(|_| {
            AppError::invalid_input(format!(
                "Value {} ('{token}') is not a number.",
                pos + 1
            ))
        })?;
        if !value.is_finite() || !domain.contains(value) {
            return Err(AppError::invalid_input(format!(
                "Value {} ({token}) is outside the {} range ({}, {}).",
                pos + 1,
                domain.label,
                domain.min,
                domain.max
            )));
        }
        values.push(value);
    }

    if values.is_empty() {
        return Err(AppError::invalid_input("Please enter at least one value."));
    }
    Ok(values)
}

/// Read a text/CSV file of values (same syntax as [`parse_values`]).
pub fn load_values(path: &Path, domain: &ValueDomain) -> Result<Series, AppError> {
    let text = fs::read_to_string(path).map_err(|e| {
        AppError::runtime(format!("Failed to read values from '{}': {e}", path.display()))
    })?;
    let values = parse_values(&text, domain)?;
    Series::new(values, SeriesSource::File(path.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WBC_DOMAIN;
    use crate::error::{EXIT_INVALID_INPUT, EXIT_RUNTIME};

    #[test]
    fn parses_comma_separated_values_in_order() {
        let values = parse_values("6.2, 5.9,6.4 ,\n7.1,", &WBC_DOMAIN).unwrap();
        assert_eq!(values, vec![6.2, 5.9, 6.4, 7.1]);
    }

    #[test]
    fn rejects_non_numeric_token() {
        let err = parse_values("6.2, abc, 5.0", &WBC_DOMAIN).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INVALID_INPUT);
        assert!(err.message().contains("Value 2"), "{}", err.message());
        assert!(err.message().contains("abc"));
    }

    #[test]
    fn rejects_values_outside_domain() {
        assert!(parse_values("6.0, 0", &WBC_DOMAIN).is_err());
        assert!(parse_values("6.0, 100", &WBC_DOMAIN).is_err());
        assert!(parse_values("-3", &WBC_DOMAIN).is_err());
        assert!(parse_values("NaN", &WBC_DOMAIN).is_err());
        assert!(parse_values("99.9, 0.1", &WBC_DOMAIN).is_ok());
    }

    #[test]
    fn rejects_empty_input() {
        assert!(parse_values("", &WBC_DOMAIN).is_err());
        assert!(parse_values(" , ,", &WBC_DOMAIN).is_err());
    }

    #[test]
    fn series_stats() {
        let series = Series::new(vec![4.0, 8.0, 6.0], SeriesSource::Input).unwrap();
        assert_eq!(series.stats.n, 3);
        assert_eq!(series.stats.min, 4.0);
        assert_eq!(series.stats.max, 8.0);
        assert!((series.stats.mean - 6.0).abs() < 1e-12);
    }

    #[test]
    fn loads_values_from_file() {
        let path = std::env::temp_dir().join(format!("wbc_setpoint_ingest_{}.csv", std::process::id()));
        std::fs::write(&path, "6.1\n5.8\n6.3\n").unwrap();
        let series = load_values(&path, &WBC_DOMAIN).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(series.values, vec![6.1, 5.8, 6.3]);
        assert!(matches!(series.source, SeriesSource::File(_)));
    }

    #[test]
    fn unreadable_file_is_a_runtime_failure() {
        let path = std::env::temp_dir().join("wbc_setpoint_ingest_missing_dir/values.csv");
        let err = load_values(&path, &WBC_DOMAIN).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_RUNTIME);
        assert!(err.message().contains("values.csv"), "{}", err.message());
    }

    #[test]
    fn malformed_file_contents_are_invalid_input() {
        let path = std::env::temp_dir().join(format!("wbc_setpoint_ingest_bad_{}.csv", std::process::id()));
        std::fs::write(&path, "6.1\nabc\n").unwrap();
        let err = load_values(&path, &WBC_DOMAIN).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert_eq!(err.exit_code(), EXIT_INVALID_INPUT);
    }
}
