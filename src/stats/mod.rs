//! Bjøntegaard-style deltas between curves.
//!
//! Two curves are compared over a closed score interval `[lo, hi]` by
//! resampling each log-metric onto evenly spaced points, reducing it to a
//! log-space mean, and exponentiating the difference of the means. The result
//! is a geometric-mean ratio of bpp (or nspp) at matched quality.
//!
//! ## Key Types
//!
//! - [`Representative`]: Log-space mean bpp and nspp of one curve over an interval
//! - [`Delta`]: Rate and runtime difference of one curve against another
//! - [`ComparisonMatrix`]: Pairwise deltas between labels
//!
//! ## Sign
//!
//! A positive percentage means the comparison curve needs more bits (or more
//! time) than the reference at the same quality.

mod compare;

pub use compare::ComparisonMatrix;

use serde::{Deserialize, Serialize};

use crate::config::{CurveConfig, DeltaIntegration, QualityGrid};
use crate::curve::Curve;
use crate::error::{Error, Result};
use crate::interpolation::PchipCurve;

/// Log-space mean bpp and nspp of a curve over a score interval.
///
/// Useful on its own as a single size-vs-runtime summary point per encoder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Representative {
    /// Mean of log bits per pixel.
    pub log_bpp: f64,
    /// Mean of log nanoseconds per pixel.
    pub log_nspp: f64,
}

impl Representative {
    /// Compute the representative point of `curve` over `[lo, hi]`.
    ///
    /// The interval must lie inside the curve's score range.
    pub fn compute(curve: &Curve, lo: f64, hi: f64, config: &CurveConfig) -> Result<Self> {
        let (curve_lo, curve_hi) = curve.domain().ok_or(Error::EmptyAggregate)?;
        if !(lo.is_finite() && hi.is_finite() && lo < hi && curve_lo <= lo && hi <= curve_hi) {
            return Err(Error::IntervalOutOfRange {
                lo,
                hi,
                curve_lo,
                curve_hi,
            });
        }
        if config.delta_points < 2 {
            return Err(Error::InvalidConfig(format!(
                "delta_points must be at least 2, got {}",
                config.delta_points
            )));
        }

        let samples = QualityGrid::linspace(lo, hi, config.delta_points);
        let xs = samples.points();

        let bpp = PchipCurve::new(&curve.scores, &curve.log_bpp)?;
        let nspp = PchipCurve::new(&curve.scores, &curve.log_nspp)?;
        let bpp_samples: Vec<f64> = xs.iter().map(|&x| bpp.evaluate(x)).collect();
        let nspp_samples: Vec<f64> = xs.iter().map(|&x| nspp.evaluate(x)).collect();

        Ok(Self {
            log_bpp: log_mean(xs, &bpp_samples, config.integration),
            log_nspp: log_mean(xs, &nspp_samples, config.integration),
        })
    }

    /// Geometric-mean bits per pixel.
    #[must_use]
    pub fn bpp(&self) -> f64 {
        self.log_bpp.exp()
    }

    /// Geometric-mean nanoseconds per pixel.
    #[must_use]
    pub fn nspp(&self) -> f64 {
        self.log_nspp.exp()
    }
}

/// Difference of one curve against a reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    /// `ln(bpp_comparison / bpp_reference)`, geometric-mean basis.
    pub log_rate_ratio: f64,
    /// `ln(nspp_comparison / nspp_reference)`, geometric-mean basis.
    pub log_runtime_ratio: f64,
    /// Rate difference in percent.
    pub rate_pct: f64,
    /// Runtime difference in percent.
    pub runtime_pct: f64,
}

impl Delta {
    /// Delta between two representative points.
    ///
    /// The log ratios are exactly antisymmetric in the argument order; the
    /// percentages are not.
    #[must_use]
    pub fn between(reference: &Representative, comparison: &Representative) -> Self {
        let log_rate_ratio = comparison.log_bpp - reference.log_bpp;
        let log_runtime_ratio = comparison.log_nspp - reference.log_nspp;
        Self {
            log_rate_ratio,
            log_runtime_ratio,
            rate_pct: ratio_to_pct(log_rate_ratio),
            runtime_pct: ratio_to_pct(log_runtime_ratio),
        }
    }

    /// Rate ratio `bpp_comparison / bpp_reference`.
    #[must_use]
    pub fn rate_ratio(&self) -> f64 {
        self.log_rate_ratio.exp()
    }

    /// Runtime ratio `nspp_comparison / nspp_reference`.
    #[must_use]
    pub fn runtime_ratio(&self) -> f64 {
        self.log_runtime_ratio.exp()
    }
}

/// Rate and runtime delta of `comparison` against `reference` over `[lo, hi]`.
///
/// # Example
///
/// ```
/// use codec_rd::{CurveConfig, curve::Curve, stats::delta};
///
/// let scores = vec![30.0, 60.0, 90.0];
/// let reference = Curve::new(scores.clone(), vec![0.0, -1.0, -2.0], vec![3.0; 3]).unwrap();
/// // Twice the bits everywhere, same speed
/// let comparison = Curve::new(
///     scores,
///     vec![2.0_f64.ln(), 2.0_f64.ln() - 1.0, 2.0_f64.ln() - 2.0],
///     vec![3.0; 3],
/// )
/// .unwrap();
///
/// let d = delta(&reference, &comparison, 40.0, 80.0, &CurveConfig::default()).unwrap();
/// assert!((d.rate_pct - 100.0).abs() < 1e-9);
/// assert!(d.runtime_pct.abs() < 1e-12);
/// ```
pub fn delta(
    reference: &Curve,
    comparison: &Curve,
    lo: f64,
    hi: f64,
    config: &CurveConfig,
) -> Result<Delta> {
    let a = Representative::compute(reference, lo, hi, config)?;
    let b = Representative::compute(comparison, lo, hi, config)?;
    Ok(Delta::between(&a, &b))
}

/// Convert a log ratio to a signed percentage.
fn ratio_to_pct(log_ratio: f64) -> f64 {
    (log_ratio.exp() - 1.0) * 100.0
}

/// Reduce evenly sampled values to their mean over the sampled interval.
fn log_mean(xs: &[f64], ys: &[f64], integration: DeltaIntegration) -> f64 {
    match integration {
        DeltaIntegration::Trapezoid => {
            let width = xs[xs.len() - 1] - xs[0];
            integrate_trapezoid(xs, ys) / width
        }
        DeltaIntegration::Mean => ys.iter().sum::<f64>() / ys.len() as f64,
    }
}

/// Trapezoidal integration of `ys` against `xs`.
fn integrate_trapezoid(xs: &[f64], ys: &[f64]) -> f64 {
    let mut area = 0.0;

    for (x, y) in xs.windows(2).zip(ys.windows(2)) {
        area += (y[0] + y[1]) / 2.0 * (x[1] - x[0]);
    }

    area
}
