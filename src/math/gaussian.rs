//! Univariate normal density.
//!
//! Evaluated straight from the closed form with no guards: a zero standard
//! deviation gives NaN (`0/0` in the exponent or `inf * 0` outside it), and
//! that NaN is allowed to flow into the EM loop where it marks a collapsed
//! component.

use std::f64::consts::PI;

/// `N(x; mean, std_dev^2)` density.
pub fn gaussian_pdf(x: f64, mean: f64, std_dev: f64) -> f64 {
    let z = x - mean;
    let norm = 1.0 / (std_dev * (2.0 * PI).sqrt());
    norm * (-(z * z) / (2.0 * std_dev * std_dev)).exp()
}
