//! Export the cumulative trend to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts:
//! one row per measurement, with empty cells where no trend point exists.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::CumulativePoint;
use crate::error::AppError;

pub const TREND_CSV_HEADER: &str = "index,value,mean,lower,upper,components";

/// Write one row per value to a CSV file.
pub fn write_trend_csv(
    path: &Path,
    values: &[f64],
    trend: &[Option<CumulativePoint>],
) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::runtime(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    write_trend(&mut out, values, trend)
        .map_err(|e| AppError::runtime(format!("Failed to write export CSV: {e}")))?;
    out.flush()
        .map_err(|e| AppError::runtime(format!("Failed to write export CSV: {e}")))
}

fn write_trend<W: Write>(
    out: &mut W,
    values: &[f64],
    trend: &[Option<CumulativePoint>],
) -> std::io::Result<()> {
    writeln!(out, "{TREND_CSV_HEADER}")?;
    for (i, value) in values.iter().enumerate() {
        match trend.get(i).copied().flatten() {
            Some(p) => writeln!(
                out,
                "{},{:.1},{},{},{},{}",
                i,
                value,
                cell(p.mean),
                cell(p.lower),
                cell(p.upper),
                p.components
            )?,
            None => writeln!(out, "{i},{value:.1},,,,")?,
        }
    }
    Ok(())
}

fn cell(v: f64) -> String {
    if v.is_finite() { format!("{v:.6}") } else { String::new() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_for_every_value_with_blank_gaps() {
        let values = [5.0, 6.0, 7.0];
        let trend = [
            None,
            None,
            Some(CumulativePoint {
                index: 2,
                mean: 6.0,
                lower: 4.04,
                upper: 7.96,
                components: 1,
            }),
        ];
        let mut buf = Vec::new();
        write_trend(&mut buf, &values, &trend).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], TREND_CSV_HEADER);
        assert_eq!(lines[1], "0,5.0,,,,");
        assert_eq!(lines[2], "1,6.0,,,,");
        assert_eq!(lines[3], "2,7.0,6.000000,4.040000,7.960000,1");
        assert_eq!(lines.len(), 4);
    }
}
