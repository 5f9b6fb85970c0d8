//! Encode measurements and source resolutions.
//!
//! A [`Measurement`] is one encode trial: one encoder configuration (the
//! label), one source, one resolution, one quality setting. Measurements are
//! produced by an external encode/score pipeline and are immutable here.
//!
//! - [`ResolutionDescriptor`]: A resolution a source is encoded at
//! - [`SourceKey`]: The (label, source) pair curves are built for
//! - [`store`]: Provider traits and an in-memory store

pub mod store;

pub use store::{MeasurementProvider, MeasurementStore, PlannedEncode, ResolutionCatalog};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One encode trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Resolution index (0 = full resolution, higher = more downscaled).
    pub resolution_index: u32,

    /// Width of the encoded image.
    pub width: u32,

    /// Height of the encoded image.
    pub height: u32,

    /// Encoder-native quality setting, arranged so that higher is better.
    pub quality_setting: i32,

    /// Encoded size in bytes.
    pub size_bytes: u64,

    /// Encode runtime in seconds.
    pub runtime_seconds: f64,

    /// Score against the source at the encode's own resolution.
    pub same_res_score: f64,

    /// Score after upscaling the decoded output back to full resolution.
    pub full_res_score: f64,
}

impl Measurement {
    /// Number of pixels at the encode's own resolution.
    #[must_use]
    pub fn num_pixels(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Check the measurement can be converted to log space.
    ///
    /// Size and runtime must be strictly positive and the scores finite. At
    /// full resolution both scores must agree.
    pub fn validate(&self, key: &SourceKey) -> Result<()> {
        let reason = if self.size_bytes == 0 {
            Some("size_bytes is zero".to_string())
        } else if !(self.runtime_seconds.is_finite() && self.runtime_seconds > 0.0) {
            Some(format!("runtime_seconds is {}", self.runtime_seconds))
        } else if !self.same_res_score.is_finite() {
            Some(format!("same_res_score is {}", self.same_res_score))
        } else if !self.full_res_score.is_finite() {
            Some(format!("full_res_score is {}", self.full_res_score))
        } else if self.width == 0 || self.height == 0 {
            Some(format!("dimensions are {}x{}", self.width, self.height))
        } else {
            None
        };

        if let Some(reason) = reason {
            return Err(Error::NonPositiveMeasurement {
                label: key.label.clone(),
                source_name: key.source.clone(),
                resolution_index: self.resolution_index,
                quality_setting: self.quality_setting,
                reason,
            });
        }

        if self.resolution_index == 0 && self.same_res_score != self.full_res_score {
            return Err(Error::InconsistentFullResScore {
                label: key.label.clone(),
                source_name: key.source.clone(),
                quality_setting: self.quality_setting,
                same_res_score: self.same_res_score,
                full_res_score: self.full_res_score,
            });
        }

        Ok(())
    }

    /// Log of bits per pixel, normalized by `num_pixels`.
    #[must_use]
    pub fn log_bpp(&self, num_pixels: u64) -> f64 {
        (self.size_bytes as f64 * 8.0 / num_pixels as f64).ln()
    }

    /// Log of nanoseconds per pixel, normalized by `num_pixels`.
    #[must_use]
    pub fn log_nspp(&self, num_pixels: u64) -> f64 {
        (self.runtime_seconds * 1e9 / num_pixels as f64).ln()
    }
}

/// A resolution a source is encoded at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionDescriptor {
    /// Resolution index (0 = full resolution).
    pub resolution_index: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ResolutionDescriptor {
    /// Create a descriptor.
    #[must_use]
    pub fn new(resolution_index: u32, width: u32, height: u32) -> Self {
        Self {
            resolution_index,
            width,
            height,
        }
    }

    /// Number of pixels.
    #[must_use]
    pub fn num_pixels(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Compute the resolution ladder for a full-resolution source.
    ///
    /// Each entry of `sizes` is a target length for the longest axis; the
    /// other axis follows the source aspect ratio. Sizes at or above 80% of
    /// the source's longest axis are skipped, since scaling to nearly the
    /// original size (or upwards) gains nothing.
    ///
    /// # Example
    ///
    /// ```
    /// use codec_rd::measurement::ResolutionDescriptor;
    ///
    /// let ladder = ResolutionDescriptor::ladder(1920, 1080, &[3840, 2560, 1920, 1280, 853, 640]);
    /// let dims: Vec<_> = ladder.iter().map(|r| (r.width, r.height)).collect();
    /// assert_eq!(dims, vec![(1920, 1080), (1280, 720), (853, 480), (640, 360)]);
    /// ```
    #[must_use]
    pub fn ladder(width: u32, height: u32, sizes: &[u32]) -> Vec<Self> {
        let longest = f64::from(width.max(height));
        let mut ladder = vec![Self::new(0, width, height)];

        for &size in sizes {
            if f64::from(size) >= 0.8 * longest {
                continue;
            }
            let scale = f64::from(size) / longest;
            let scaled_width = (f64::from(width) * scale).round_ties_even() as u32;
            let scaled_height = (f64::from(height) * scale).round_ties_even() as u32;
            ladder.push(Self::new(ladder.len() as u32, scaled_width, scaled_height));
        }

        ladder
    }
}

/// Check a source's resolution list.
///
/// The list must start at index 0, have strictly increasing indices, no
/// empty dimensions, and resolution 0 must have the most pixels.
pub fn validate_resolutions(source: &str, resolutions: &[ResolutionDescriptor]) -> Result<()> {
    let invalid = |reason: String| Error::InvalidResolutions {
        source_name: source.to_string(),
        reason,
    };

    let full = resolutions
        .first()
        .ok_or_else(|| invalid("no resolutions recorded".to_string()))?;
    if full.resolution_index != 0 {
        return Err(invalid(format!(
            "first resolution has index {}, expected 0",
            full.resolution_index
        )));
    }
    if let Some(w) = resolutions
        .windows(2)
        .find(|w| w[1].resolution_index <= w[0].resolution_index)
    {
        return Err(invalid(format!(
            "resolution indices not strictly increasing ({} then {})",
            w[0].resolution_index, w[1].resolution_index
        )));
    }
    if let Some(r) = resolutions.iter().find(|r| r.num_pixels() == 0) {
        return Err(invalid(format!(
            "resolution {} has empty dimensions {}x{}",
            r.resolution_index, r.width, r.height
        )));
    }
    if let Some(r) = resolutions[1..]
        .iter()
        .find(|r| r.num_pixels() >= full.num_pixels())
    {
        return Err(invalid(format!(
            "resolution {} ({}x{}) is not smaller than full resolution ({}x{})",
            r.resolution_index, r.width, r.height, full.width, full.height
        )));
    }
    Ok(())
}

/// Identifies one source encoded under one label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceKey {
    /// Encode set label (one encoder configuration).
    pub label: String,
    /// Source name.
    pub source: String,
}

impl SourceKey {
    /// Create a key.
    #[must_use]
    pub fn new(label: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            source: source.into(),
        }
    }
}

impl std::fmt::Display for SourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.label, self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Measurement {
        Measurement {
            resolution_index: 0,
            width: 40,
            height: 40,
            quality_setting: 75,
            size_bytes: 40,
            runtime_seconds: 0.0016,
            same_res_score: 50.0,
            full_res_score: 50.0,
        }
    }

    #[test]
    fn test_log_conversions() {
        let m = sample();
        // 40 bytes * 8 / 1600 px = 0.2 bpp
        assert!((m.log_bpp(m.num_pixels()).exp() - 0.2).abs() < 1e-12);
        // 0.0016 s * 1e9 / 1600 px = 1e3 ns/px
        assert!((m.log_nspp(m.num_pixels()).exp() - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_validate_rejects_zero_size() {
        let key = SourceKey::new("aom", "frame");
        let m = Measurement {
            size_bytes: 0,
            ..sample()
        };
        assert!(matches!(
            m.validate(&key),
            Err(Error::NonPositiveMeasurement { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_non_positive_runtime() {
        let key = SourceKey::new("aom", "frame");
        for runtime in [0.0, -1.0, f64::NAN] {
            let m = Measurement {
                runtime_seconds: runtime,
                ..sample()
            };
            assert!(m.validate(&key).is_err());
        }
    }

    #[test]
    fn test_validate_full_res_score_invariant() {
        let key = SourceKey::new("aom", "frame");
        let m = Measurement {
            full_res_score: 49.0,
            ..sample()
        };
        assert!(matches!(
            m.validate(&key),
            Err(Error::InconsistentFullResScore { .. })
        ));

        // Downscaled encodes may legitimately differ
        let scaled = Measurement {
            resolution_index: 1,
            full_res_score: 49.0,
            ..sample()
        };
        assert!(scaled.validate(&key).is_ok());
    }

    #[test]
    fn test_ladder_skips_near_full_size() {
        // 4096 wide: 3840 is within 80% of the longest axis and is skipped
        let ladder = ResolutionDescriptor::ladder(4096, 2304, &[3840, 2560, 1920]);
        assert_eq!(ladder.len(), 3);
        assert_eq!(ladder[1], ResolutionDescriptor::new(1, 2560, 1440));
        assert_eq!(ladder[2], ResolutionDescriptor::new(2, 1920, 1080));
    }

    #[test]
    fn test_ladder_portrait() {
        let ladder = ResolutionDescriptor::ladder(1080, 1920, &[1280]);
        assert_eq!(ladder[1], ResolutionDescriptor::new(1, 720, 1280));
    }

    #[test]
    fn test_validate_resolutions() {
        let good = ResolutionDescriptor::ladder(1920, 1080, &[1280, 640]);
        assert!(validate_resolutions("frame", &good).is_ok());

        assert!(validate_resolutions("frame", &[]).is_err());

        let bad_start = [ResolutionDescriptor::new(1, 1920, 1080)];
        assert!(validate_resolutions("frame", &bad_start).is_err());

        let bigger = [
            ResolutionDescriptor::new(0, 640, 360),
            ResolutionDescriptor::new(1, 1280, 720),
        ];
        assert!(validate_resolutions("frame", &bigger).is_err());

        let unsorted = [
            ResolutionDescriptor::new(0, 1920, 1080),
            ResolutionDescriptor::new(2, 640, 360),
            ResolutionDescriptor::new(1, 1280, 720),
        ];
        assert!(validate_resolutions("frame", &unsorted).is_err());
    }
}
