//! Small descriptive-statistics helpers shared by the fitters.

/// Arithmetic mean. NaN for an empty slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Bessel-corrected sample variance (divides by `n - 1`).
///
/// Returns NaN when fewer than `min_len` values are available. The fitters
/// pass 3 here: with one or two measurements the spread is not worth
/// reporting.
pub fn sample_variance(data: &[f64], min_len: usize) -> f64 {
    let n = data.len();
    if n < min_len.max(2) {
        return f64::NAN;
    }
    let m = mean(data);
    let ss: f64 = data.iter().map(|&x| (x - m) * (x - m)).sum();
    ss / (n as f64 - 1.0)
}

/// Index of the largest value, first index on ties. NaNs never win.
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some(b) if v <= values[b] => {}
            _ => best = Some(i),
        }
    }
    best
}

/// `(min, max)` of the finite values, if any.
pub fn finite_range(data: &[f64]) -> Option<(f64, f64)> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &v in data.iter().filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    (lo <= hi).then_some((lo, hi))
}

/// `steps` evenly spaced points from `min` to `max` inclusive.
///
/// `steps < 2` is bumped to 2 so both endpoints are always present.
pub fn linspace(min: f64, max: f64, steps: usize) -> Vec<f64> {
    let steps = steps.max(2);
    let step = (max - min) / (steps as f64 - 1.0);
    (0..steps).map(|i| min + step * i as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_bessel_variance() {
        let data = [5.0, 6.0, 7.0];
        assert!((mean(&data) - 6.0).abs() < 1e-12);
        assert!((sample_variance(&data, 3) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn variance_undefined_below_minimum() {
        assert!(sample_variance(&[4.0, 8.0], 3).is_nan());
        assert!(sample_variance(&[4.0], 1).is_nan());
        assert!((sample_variance(&[4.0, 8.0], 2) - 8.0).abs() < 1e-12);
    }

    #[test]
    fn argmax_keeps_first_on_ties_and_skips_nan() {
        assert_eq!(argmax(&[0.25, 0.5, 0.5]), Some(1));
        assert_eq!(argmax(&[f64::NAN, 0.1]), Some(1));
        assert_eq!(argmax(&[f64::NAN]), None);
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn linspace_includes_endpoints() {
        let v = linspace(2.0, 12.0, 6);
        assert_eq!(v.len(), 6);
        assert!((v[0] - 2.0).abs() < 1e-12);
        assert!((v[5] - 12.0).abs() < 1e-12);
        assert!((v[1] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn finite_range_ignores_nan() {
        assert_eq!(finite_range(&[3.0, f64::NAN, 1.0]), Some((1.0, 3.0)));
        assert_eq!(finite_range(&[f64::NAN]), None);
    }
}
