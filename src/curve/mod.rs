//! Quality-indexed rate and runtime curves.
//!
//! A [`Curve`] maps each score on a [`QualityGrid`] to the natural log of bits
//! per pixel and of nanoseconds per pixel. Working in log space means that an
//! arithmetic mean of curves is the log of the geometric mean of the true
//! values, and that differences between curves are log-ratios.
//!
//! - [`CurveBuilder`]: Turns one resolution's measurements into curves
//! - [`multires`]: Best-of-resolutions envelope
//! - [`aggregate`]: Means across sources
//! - [`source`]: All curves for one (label, source)

pub mod aggregate;
pub mod multires;
pub mod source;

pub use aggregate::{CurveSlot, LabelCurves, SlotCurve, aggregate};
pub use multires::{MultiresCurve, merge_multires};
pub use source::SourceCurves;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::QualityGrid;
use crate::error::{Error, Result};
use crate::interpolation::{Interpolator, Pchip, PchipCurve};
use crate::measurement::{Measurement, ResolutionDescriptor, SourceKey};

/// Log-space rate and runtime values over an ascending score grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    /// Quality scores, strictly increasing.
    pub scores: Vec<f64>,
    /// Natural log of bits per pixel at each score.
    pub log_bpp: Vec<f64>,
    /// Natural log of nanoseconds per pixel at each score.
    pub log_nspp: Vec<f64>,
}

/// One point of a curve in linear units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    /// Quality score.
    pub score: f64,
    /// Bits per pixel.
    pub bpp: f64,
    /// Nanoseconds per pixel.
    pub nspp: f64,
}

impl Curve {
    /// Create a curve, checking lengths and score ordering.
    pub fn new(scores: Vec<f64>, log_bpp: Vec<f64>, log_nspp: Vec<f64>) -> Result<Self> {
        if scores.len() != log_bpp.len() || scores.len() != log_nspp.len() {
            return Err(Error::InvalidInterpolationInput(format!(
                "curve has {} scores, {} log_bpp and {} log_nspp values",
                scores.len(),
                log_bpp.len(),
                log_nspp.len()
            )));
        }
        if scores.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::InvalidInterpolationInput(
                "curve scores must be strictly increasing".to_string(),
            ));
        }
        Ok(Self {
            scores,
            log_bpp,
            log_nspp,
        })
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Check if the curve has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// The `[lowest, highest]` score covered.
    #[must_use]
    pub fn domain(&self) -> Option<(f64, f64)> {
        Some((*self.scores.first()?, *self.scores.last()?))
    }

    /// Bits per pixel at each grid point.
    #[must_use]
    pub fn bpp(&self) -> Vec<f64> {
        self.log_bpp.iter().map(|v| v.exp()).collect()
    }

    /// Nanoseconds per pixel at each grid point.
    #[must_use]
    pub fn nspp(&self) -> Vec<f64> {
        self.log_nspp.iter().map(|v| v.exp()).collect()
    }

    /// All grid points in linear units.
    pub fn points(&self) -> impl Iterator<Item = CurvePoint> + '_ {
        self.scores
            .iter()
            .zip(&self.log_bpp)
            .zip(&self.log_nspp)
            .map(|((&score, lb), ln)| CurvePoint {
                score,
                bpp: lb.exp(),
                nspp: ln.exp(),
            })
    }

    /// Value at an arbitrary score inside the curve's domain.
    ///
    /// Grid points are returned as stored; scores between grid points are
    /// interpolated. Returns `None` outside the domain.
    #[must_use]
    pub fn sample(&self, score: f64) -> Option<CurvePoint> {
        let (lo, hi) = self.domain()?;
        if !(lo <= score && score <= hi) {
            return None;
        }

        if let Some(i) = self.scores.iter().position(|&s| s == score) {
            return Some(CurvePoint {
                score,
                bpp: self.log_bpp[i].exp(),
                nspp: self.log_nspp[i].exp(),
            });
        }

        let bpp = PchipCurve::new(&self.scores, &self.log_bpp).ok()?;
        let nspp = PchipCurve::new(&self.scores, &self.log_nspp).ok()?;
        Some(CurvePoint {
            score,
            bpp: bpp.evaluate(score).exp(),
            nspp: nspp.evaluate(score).exp(),
        })
    }

    /// Check that `other` is sampled on the same scores.
    pub(crate) fn ensure_same_grid(&self, other: &Self) -> Result<()> {
        if self.scores != other.scores {
            return Err(Error::GridMismatch {
                expected: self.scores.len(),
                expected_lo: self.scores.first().copied().unwrap_or(f64::NAN),
                expected_hi: self.scores.last().copied().unwrap_or(f64::NAN),
                actual: other.scores.len(),
            });
        }
        Ok(())
    }
}

/// A curve covering only part of a grid.
///
/// Used for full-resolution-normalized curves of downscaled encodes, which
/// rarely reach the highest full-resolution scores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialCurve {
    /// Index into the grid of each covered point, ascending.
    pub grid_indices: Vec<usize>,
    /// Score at each covered point.
    pub scores: Vec<f64>,
    /// Natural log of full-resolution-normalized bits per pixel.
    pub log_bpp: Vec<f64>,
    /// Natural log of full-resolution-normalized nanoseconds per pixel.
    pub log_nspp: Vec<f64>,
}

impl PartialCurve {
    /// Number of covered grid points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.grid_indices.len()
    }

    /// Check if no grid point is covered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grid_indices.is_empty()
    }
}

/// Curves built from one resolution's measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionCurves {
    /// The resolution these curves describe.
    pub resolution: ResolutionDescriptor,
    /// Curve against same-resolution scores, normalized by own pixel count.
    pub same_res: Curve,
    /// Curve against full-resolution scores, normalized by full-res pixel count.
    pub full_res: PartialCurve,
}

/// Builds per-resolution curves on a fixed grid.
#[derive(Debug, Clone)]
pub struct CurveBuilder<I = Pchip> {
    grid: QualityGrid,
    interpolator: I,
}

impl CurveBuilder<Pchip> {
    /// Create a builder using PCHIP interpolation.
    #[must_use]
    pub fn new(grid: QualityGrid) -> Self {
        Self::with_interpolator(grid, Pchip)
    }
}

impl<I: Interpolator> CurveBuilder<I> {
    /// Create a builder with a custom interpolator.
    #[must_use]
    pub fn with_interpolator(grid: QualityGrid, interpolator: I) -> Self {
        Self { grid, interpolator }
    }

    /// The grid curves are built on.
    #[must_use]
    pub fn grid(&self) -> &QualityGrid {
        &self.grid
    }

    /// The interpolator in use.
    #[must_use]
    pub fn interpolator(&self) -> &I {
        &self.interpolator
    }

    /// Build the same-res curve and full-res partial curve for one resolution.
    ///
    /// `measurements` must all belong to `resolution`. Fails with
    /// [`Error::NoDataForKey`] on an empty set and with
    /// [`Error::InsufficientQualityRange`] when the same-res scores do not
    /// bracket the grid; in both cases nothing is interpolated.
    pub fn build(
        &self,
        key: &SourceKey,
        resolution: &ResolutionDescriptor,
        full_res: &ResolutionDescriptor,
        measurements: &[Measurement],
    ) -> Result<ResolutionCurves> {
        if measurements.is_empty() {
            return Err(Error::NoDataForKey {
                label: key.label.clone(),
                source_name: key.source.clone(),
                resolution_index: resolution.resolution_index,
            });
        }

        for m in measurements {
            if m.resolution_index != resolution.resolution_index
                || m.width != resolution.width
                || m.height != resolution.height
            {
                return Err(Error::ResolutionMismatch {
                    source_name: key.source.clone(),
                    expected_index: resolution.resolution_index,
                    actual_index: m.resolution_index,
                    actual_width: m.width,
                    actual_height: m.height,
                });
            }
            m.validate(key)?;
        }

        let mut sorted: Vec<&Measurement> = measurements.iter().collect();
        sorted.sort_by(|a, b| a.same_res_score.total_cmp(&b.same_res_score));

        let available_lo = sorted[0].same_res_score;
        let available_hi = sorted[sorted.len() - 1].same_res_score;
        if available_lo > self.grid.lo() || available_hi < self.grid.hi() {
            return Err(Error::InsufficientQualityRange {
                label: key.label.clone(),
                source_name: key.source.clone(),
                resolution_index: resolution.resolution_index,
                requested_lo: self.grid.lo(),
                requested_hi: self.grid.hi(),
                available_lo,
                available_hi,
            });
        }

        let num_pixels = resolution.num_pixels();
        let scores: Vec<f64> = sorted.iter().map(|m| m.same_res_score).collect();
        let log_bpp: Vec<f64> = sorted.iter().map(|m| m.log_bpp(num_pixels)).collect();
        let log_nspp: Vec<f64> = sorted.iter().map(|m| m.log_nspp(num_pixels)).collect();

        let targets = self.grid.points();
        let same_res = Curve {
            scores: targets.to_vec(),
            log_bpp: self
                .interpolator
                .interpolate(&scores, &log_bpp, targets)
                .map_err(|e| interpolation_failed(key, resolution, "same-res", &e))?,
            log_nspp: self
                .interpolator
                .interpolate(&scores, &log_nspp, targets)
                .map_err(|e| interpolation_failed(key, resolution, "same-res", &e))?,
        };

        sorted.sort_by(|a, b| a.full_res_score.total_cmp(&b.full_res_score));
        let full_res = self
            .build_full_res(&sorted, full_res.num_pixels())
            .map_err(|e| interpolation_failed(key, resolution, "full-res", &e))?;

        debug!(
            key = %key,
            resolution = resolution.resolution_index,
            points = measurements.len(),
            full_res_coverage = full_res.len(),
            "built resolution curves"
        );

        Ok(ResolutionCurves {
            resolution: *resolution,
            same_res,
            full_res,
        })
    }

    /// Interpolate the grid subset covered by full-res scores.
    fn build_full_res(&self, sorted: &[&Measurement], full_pixels: u64) -> Result<PartialCurve> {
        let lo = sorted[0].full_res_score;
        let hi = sorted[sorted.len() - 1].full_res_score;

        let grid_indices = self.grid.indices_within(lo, hi);
        if grid_indices.is_empty() {
            return Ok(PartialCurve::default());
        }

        let targets: Vec<f64> = grid_indices.iter().map(|&i| self.grid.points()[i]).collect();
        let scores: Vec<f64> = sorted.iter().map(|m| m.full_res_score).collect();
        let log_bpp: Vec<f64> = sorted.iter().map(|m| m.log_bpp(full_pixels)).collect();
        let log_nspp: Vec<f64> = sorted.iter().map(|m| m.log_nspp(full_pixels)).collect();

        Ok(PartialCurve {
            log_bpp: self.interpolator.interpolate(&scores, &log_bpp, &targets)?,
            log_nspp: self.interpolator.interpolate(&scores, &log_nspp, &targets)?,
            scores: targets,
            grid_indices,
        })
    }
}

fn interpolation_failed(
    key: &SourceKey,
    resolution: &ResolutionDescriptor,
    pass: &'static str,
    err: &Error,
) -> Error {
    Error::InterpolationFailed {
        label: key.label.clone(),
        source_name: key.source.clone(),
        resolution_index: resolution.resolution_index,
        pass,
        reason: err.to_string(),
    }
}

/// Build one resolution's curves with PCHIP interpolation.
///
/// Convenience wrapper around [`CurveBuilder::build`].
pub fn build_curve(
    key: &SourceKey,
    resolution: &ResolutionDescriptor,
    full_res: &ResolutionDescriptor,
    measurements: &[Measurement],
    grid: &QualityGrid,
) -> Result<ResolutionCurves> {
    CurveBuilder::new(grid.clone()).build(key, resolution, full_res, measurements)
}
