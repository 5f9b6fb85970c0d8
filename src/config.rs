//! Curve engine configuration.
//!
//! A single [`CurveConfig`] is threaded through every curve operation: the
//! quality grid, the Bjøntegaard-delta sampling and the resolution ladder all
//! come from here rather than from module constants.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Integration rule used to reduce a resampled log-metric to its mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaIntegration {
    /// Trapezoidal rule over the sample points, divided by the interval width.
    #[default]
    Trapezoid,
    /// Plain arithmetic mean of the sample points.
    ///
    /// Gives the end points the same weight as interior points.
    Mean,
}

impl std::str::FromStr for DeltaIntegration {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "trapezoid" | "trapezoidal" | "trapz" => Ok(Self::Trapezoid),
            "mean" | "average" => Ok(Self::Mean),
            other => Err(Error::InvalidConfig(format!(
                "unknown integration rule '{other}' (expected trapezoid or mean)"
            ))),
        }
    }
}

/// Configuration for curve construction and comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveConfig {
    /// Lowest quality score on the interpolation grid.
    pub score_lo: f64,
    /// Highest quality score on the interpolation grid.
    pub score_hi: f64,
    /// Number of evenly spaced grid points, end points included.
    pub score_steps: usize,
    /// Number of resample points used when computing deltas.
    pub delta_points: usize,
    /// Integration rule for deltas and representative points.
    pub integration: DeltaIntegration,
    /// Target sizes along the longest axis for downscaled encodes.
    pub ladder_sizes: Vec<u32>,
}

impl Default for CurveConfig {
    fn default() -> Self {
        // With lo = 30, hi = 90, steps = 61 the grid is [30, 31, ..., 90]
        Self {
            score_lo: 30.0,
            score_hi: 90.0,
            score_steps: 61,
            delta_points: 50,
            integration: DeltaIntegration::Trapezoid,
            ladder_sizes: vec![3840, 2560, 1920, 1280, 853, 640],
        }
    }
}

impl CurveConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> CurveConfigBuilder {
        CurveConfigBuilder::default()
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration describes a usable grid.
    pub fn validate(&self) -> Result<()> {
        if !(self.score_lo.is_finite() && self.score_hi.is_finite()) {
            return Err(Error::InvalidConfig("score bounds must be finite".to_string()));
        }
        if self.score_lo >= self.score_hi {
            return Err(Error::InvalidConfig(format!(
                "score_lo ({}) must be below score_hi ({})",
                self.score_lo, self.score_hi
            )));
        }
        if self.score_steps < 2 {
            return Err(Error::InvalidConfig(format!(
                "score_steps must be at least 2, got {}",
                self.score_steps
            )));
        }
        if self.delta_points < 2 {
            return Err(Error::InvalidConfig(format!(
                "delta_points must be at least 2, got {}",
                self.delta_points
            )));
        }
        Ok(())
    }

    /// Build the quality grid described by this configuration.
    pub fn grid(&self) -> Result<QualityGrid> {
        self.validate()?;
        Ok(QualityGrid::linspace(self.score_lo, self.score_hi, self.score_steps))
    }
}

/// Builder for [`CurveConfig`].
#[derive(Debug, Default)]
pub struct CurveConfigBuilder {
    config: CurveConfig,
}

impl CurveConfigBuilder {
    /// Set the grid bounds.
    #[must_use]
    pub fn score_range(mut self, lo: f64, hi: f64) -> Self {
        self.config.score_lo = lo;
        self.config.score_hi = hi;
        self
    }

    /// Set the number of grid points.
    #[must_use]
    pub fn score_steps(mut self, steps: usize) -> Self {
        self.config.score_steps = steps;
        self
    }

    /// Set the number of delta resample points.
    #[must_use]
    pub fn delta_points(mut self, points: usize) -> Self {
        self.config.delta_points = points;
        self
    }

    /// Set the delta integration rule.
    #[must_use]
    pub fn integration(mut self, integration: DeltaIntegration) -> Self {
        self.config.integration = integration;
        self
    }

    /// Set the resolution ladder sizes.
    #[must_use]
    pub fn ladder_sizes(mut self, sizes: Vec<u32>) -> Self {
        self.config.ladder_sizes = sizes;
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<CurveConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Ascending sequence of quality scores that curves are sampled on.
///
/// Not necessarily uniformly spaced, but always strictly increasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityGrid {
    points: Vec<f64>,
}

impl QualityGrid {
    /// Evenly spaced grid from `lo` to `hi` inclusive.
    ///
    /// The end points are exact; interior points are `lo + i * step`.
    #[must_use]
    pub fn linspace(lo: f64, hi: f64, steps: usize) -> Self {
        let points = match steps {
            0 => Vec::new(),
            1 => vec![lo],
            n => {
                let step = (hi - lo) / (n - 1) as f64;
                (0..n)
                    .map(|i| if i == n - 1 { hi } else { lo + i as f64 * step })
                    .collect()
            }
        };
        Self { points }
    }

    /// Grid from explicit points, which must be finite and strictly increasing.
    pub fn from_points(points: Vec<f64>) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::InvalidConfig("quality grid is empty".to_string()));
        }
        if points.iter().any(|p| !p.is_finite()) {
            return Err(Error::InvalidConfig("quality grid contains a non-finite score".to_string()));
        }
        if points.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::InvalidConfig(
                "quality grid must be strictly increasing".to_string(),
            ));
        }
        Ok(Self { points })
    }

    /// Grid scores.
    #[must_use]
    pub fn points(&self) -> &[f64] {
        &self.points
    }

    /// Number of grid points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the grid has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Lowest grid score.
    #[must_use]
    pub fn lo(&self) -> f64 {
        self.points.first().copied().unwrap_or(f64::NAN)
    }

    /// Highest grid score.
    #[must_use]
    pub fn hi(&self) -> f64 {
        self.points.last().copied().unwrap_or(f64::NAN)
    }

    /// Indices of the grid points inside `[lo, hi]`.
    #[must_use]
    pub fn indices_within(&self, lo: f64, hi: f64) -> Vec<usize> {
        self.points
            .iter()
            .enumerate()
            .filter(|&(_, &p)| lo <= p && p <= hi)
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_grid() {
        let grid = CurveConfig::default().grid().unwrap();
        assert_eq!(grid.len(), 61);
        assert_eq!(grid.lo(), 30.0);
        assert_eq!(grid.hi(), 90.0);
        assert!((grid.points()[10] - 40.0).abs() < 1e-12);
    }

    #[test]
    fn test_builder_rejects_inverted_range() {
        let result = CurveConfig::builder().score_range(90.0, 30.0).build();
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_builder_rejects_single_delta_point() {
        let result = CurveConfig::builder().delta_points(1).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_from_points_requires_increasing() {
        assert!(QualityGrid::from_points(vec![30.0, 40.0, 40.0]).is_err());
        assert!(QualityGrid::from_points(vec![]).is_err());
        let grid = QualityGrid::from_points(vec![30.0, 45.0, 90.0]).unwrap();
        assert_eq!(grid.len(), 3);
    }

    #[test]
    fn test_indices_within() {
        let grid = QualityGrid::linspace(30.0, 90.0, 7);
        assert_eq!(grid.indices_within(45.0, 72.0), vec![2, 3, 4]);
        assert_eq!(grid.indices_within(30.0, 90.0).len(), 7);
        assert!(grid.indices_within(91.0, 95.0).is_empty());
    }

    #[test]
    fn test_integration_from_str() {
        assert_eq!("trapz".parse::<DeltaIntegration>().unwrap(), DeltaIntegration::Trapezoid);
        assert_eq!("Mean".parse::<DeltaIntegration>().unwrap(), DeltaIntegration::Mean);
        assert!("simpson".parse::<DeltaIntegration>().is_err());
    }

    #[test]
    fn test_config_json_partial() {
        let config: CurveConfig = serde_json::from_str(r#"{"score_lo": 40.0}"#).unwrap();
        assert_eq!(config.score_lo, 40.0);
        assert_eq!(config.score_hi, 90.0);
        assert_eq!(config.integration, DeltaIntegration::Trapezoid);
    }

    #[test]
    fn test_config_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("curves.json");
        std::fs::write(&path, r#"{"score_steps": 7, "integration": "mean"}"#).unwrap();
        let config = CurveConfig::from_json_file(&path).unwrap();
        assert_eq!(config.score_steps, 7);
        assert_eq!(config.integration, DeltaIntegration::Mean);
    }
}
