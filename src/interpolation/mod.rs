//! Shape-preserving interpolation of quality curves.
//!
//! Rate-distortion measurements are sparse: an encoder sweep typically yields
//! ten or so (score, size) points per resolution. This module turns those
//! points into values on an arbitrary score grid.
//!
//! ## Key Types
//!
//! - [`Interpolator`]: The seam the curve builder interpolates through
//! - [`Pchip`]: Piecewise cubic Hermite interpolation (the default)
//! - [`PchipCurve`]: A fitted PCHIP curve that can be evaluated repeatedly
//!
//! ## Methodology
//!
//! PCHIP fits a cubic Hermite polynomial on each interval, choosing the
//! derivative at each control point so that the interpolant never overshoots
//! its neighbouring points:
//!
//! - Interior points where the secant slope changes sign (a local extremum)
//!   or is zero get a zero derivative
//! - Other interior points use a weighted harmonic mean of the adjacent
//!   secant slopes (Fritsch–Carlson)
//! - End points use a one-sided three-point estimate, clamped so that it
//!   keeps the sign of the end secant
//!
//! Natural cubic splines would be smoother but can overshoot, which would
//! fabricate sizes that no encode produced.
//!
//! Values requested outside the control point range are extrapolated with the
//! boundary cubic. Callers are expected to filter targets to the covered range.

use crate::error::{Error, Result};

/// Interpolates `ys` sampled at strictly increasing `xs` onto `targets`.
pub trait Interpolator {
    /// Interpolate `(xs, ys)` at each value of `targets`.
    fn interpolate(&self, xs: &[f64], ys: &[f64], targets: &[f64]) -> Result<Vec<f64>>;
}

/// Piecewise cubic Hermite interpolating polynomial.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pchip;

impl Interpolator for Pchip {
    fn interpolate(&self, xs: &[f64], ys: &[f64], targets: &[f64]) -> Result<Vec<f64>> {
        pchip_interpolate(xs, ys, targets)
    }
}

/// A fitted PCHIP curve.
#[derive(Debug, Clone)]
pub struct PchipCurve {
    xs: Vec<f64>,
    ys: Vec<f64>,
    slopes: Vec<f64>,
}

impl PchipCurve {
    /// Fit a curve through `(xs, ys)`.
    ///
    /// Requires at least two points, equal lengths, finite values and
    /// strictly increasing `xs`.
    pub fn new(xs: &[f64], ys: &[f64]) -> Result<Self> {
        if xs.len() != ys.len() {
            return Err(Error::InvalidInterpolationInput(format!(
                "{} x values but {} y values",
                xs.len(),
                ys.len()
            )));
        }
        if xs.len() < 2 {
            return Err(Error::InvalidInterpolationInput(format!(
                "need at least 2 control points, got {}",
                xs.len()
            )));
        }
        if xs.iter().chain(ys).any(|v| !v.is_finite()) {
            return Err(Error::InvalidInterpolationInput(
                "control points must be finite".to_string(),
            ));
        }
        if let Some(i) = xs.windows(2).position(|w| w[1] <= w[0]) {
            return Err(Error::InvalidInterpolationInput(format!(
                "x values must be strictly increasing, but x[{}] = {} and x[{}] = {}",
                i,
                xs[i],
                i + 1,
                xs[i + 1]
            )));
        }

        let slopes = pchip_slopes(xs, ys);
        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            slopes,
        })
    }

    /// The `[min, max]` range of the control points.
    #[must_use]
    pub fn domain(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    /// Evaluate the curve at `x`.
    ///
    /// Passes exactly through every control point.
    #[must_use]
    pub fn evaluate(&self, x: f64) -> f64 {
        let n = self.xs.len();
        // Interval k covers [xs[k], xs[k+1]); the last interval also takes the
        // final point and anything beyond it.
        let k = self.xs.partition_point(|&v| v <= x).saturating_sub(1).min(n - 2);

        let h = self.xs[k + 1] - self.xs[k];
        let t = (x - self.xs[k]) / h;
        let t2 = t * t;
        let t3 = t2 * t;

        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;

        h00 * self.ys[k]
            + h10 * h * self.slopes[k]
            + h01 * self.ys[k + 1]
            + h11 * h * self.slopes[k + 1]
    }
}

/// Interpolate `(xs, ys)` onto `targets` with PCHIP.
///
/// # Example
///
/// ```
/// use codec_rd::interpolation::pchip_interpolate;
///
/// let xs = [30.0, 50.0, 70.0, 90.0];
/// let ys = [0.5_f64.ln(), 0.2_f64.ln(), 0.1_f64.ln(), 0.05_f64.ln()];
///
/// let out = pchip_interpolate(&xs, &ys, &[50.0, 60.0]).unwrap();
/// assert_eq!(out[0], 0.2_f64.ln());
/// assert!(out[1] < 0.2_f64.ln() && out[1] > 0.1_f64.ln());
/// ```
pub fn pchip_interpolate(xs: &[f64], ys: &[f64], targets: &[f64]) -> Result<Vec<f64>> {
    let curve = PchipCurve::new(xs, ys)?;
    Ok(targets.iter().map(|&x| curve.evaluate(x)).collect())
}

/// Derivatives at each control point.
fn pchip_slopes(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
    let m: Vec<f64> = ys
        .windows(2)
        .zip(&h)
        .map(|(w, &hk)| (w[1] - w[0]) / hk)
        .collect();

    if n == 2 {
        return vec![m[0], m[0]];
    }

    let mut d = vec![0.0; n];
    for k in 1..n - 1 {
        let (m0, m1) = (m[k - 1], m[k]);
        if m0 == 0.0 || m1 == 0.0 || m0.signum() != m1.signum() {
            continue;
        }
        let w1 = 2.0 * h[k] + h[k - 1];
        let w2 = h[k] + 2.0 * h[k - 1];
        d[k] = (w1 + w2) / (w1 / m0 + w2 / m1);
    }

    d[0] = edge_slope(h[0], h[1], m[0], m[1]);
    d[n - 1] = edge_slope(h[n - 2], h[n - 3], m[n - 2], m[n - 3]);
    d
}

/// One-sided three-point end derivative, kept shape-preserving.
fn edge_slope(h0: f64, h1: f64, m0: f64, m1: f64) -> f64 {
    let d = ((2.0 * h0 + h1) * m0 - h0 * m1) / (h0 + h1);
    if sign(d) != sign(m0) {
        0.0
    } else if sign(m0) != sign(m1) && d.abs() > 3.0 * m0.abs() {
        3.0 * m0
    } else {
        d
    }
}

/// Sign with zero mapped to zero.
fn sign(v: f64) -> i8 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passes_through_control_points() {
        let xs = [12.5, 31.0, 47.25, 60.0, 88.0, 96.5];
        let ys = [-0.3, -1.1, -1.15, -2.4, -2.41, -4.0];

        let out = pchip_interpolate(&xs, &ys, &xs).unwrap();
        for (got, want) in out.iter().zip(&ys) {
            assert_eq!(got, want);
        }
    }

    #[test]
    fn test_linear_data_is_reproduced() {
        // y = 2x + 1: every secant is 2, so every derivative is 2
        let xs = [0.0, 1.0, 3.0, 4.0, 7.0];
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 * x + 1.0).collect();

        let targets = [0.5, 2.0, 3.5, 6.0];
        let out = pchip_interpolate(&xs, &ys, &targets).unwrap();
        for (x, y) in targets.iter().zip(&out) {
            assert!((y - (2.0 * x + 1.0)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_two_points_is_linear() {
        let out = pchip_interpolate(&[10.0, 20.0], &[1.0, 3.0], &[15.0, 12.5]).unwrap();
        assert!((out[0] - 2.0).abs() < 1e-12);
        assert!((out[1] - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_no_overshoot_on_step() {
        // A natural spline rings around this step; PCHIP must stay inside
        // the range of the neighbouring control points
        let xs = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let ys = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let targets: Vec<f64> = (0..=50).map(|i| i as f64 * 0.1).collect();
        let out = pchip_interpolate(&xs, &ys, &targets).unwrap();
        for y in out {
            assert!((-1e-12..=1.0 + 1e-12).contains(&y), "overshoot: {y}");
        }
    }

    #[test]
    fn test_preserves_monotonicity() {
        let xs = [30.0, 42.0, 50.0, 71.0, 90.0];
        let ys = [1.0, 0.4, 0.35, -0.8, -2.0];

        let targets: Vec<f64> = (0..=120).map(|i| 30.0 + i as f64 * 0.5).collect();
        let out = pchip_interpolate(&xs, &ys, &targets).unwrap();
        for w in out.windows(2) {
            assert!(w[1] <= w[0]);
        }
    }

    #[test]
    fn test_local_extremum_gets_flat_slope() {
        let curve = PchipCurve::new(&[0.0, 1.0, 2.0], &[0.0, 1.0, 0.0]).unwrap();
        assert_eq!(curve.slopes[1], 0.0);
        // Peak is not exceeded
        assert!(curve.evaluate(0.9) <= 1.0);
        assert!(curve.evaluate(1.1) <= 1.0);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(PchipCurve::new(&[1.0], &[1.0]).is_err());
        assert!(PchipCurve::new(&[1.0, 2.0], &[1.0]).is_err());
        assert!(PchipCurve::new(&[1.0, 1.0, 2.0], &[1.0, 2.0, 3.0]).is_err());
        assert!(PchipCurve::new(&[2.0, 1.0], &[1.0, 2.0]).is_err());
        assert!(PchipCurve::new(&[1.0, 2.0], &[f64::NEG_INFINITY, 2.0]).is_err());
    }

    #[test]
    fn test_domain() {
        let curve = PchipCurve::new(&[30.0, 50.0, 90.0], &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(curve.domain(), (30.0, 90.0));
    }
}
