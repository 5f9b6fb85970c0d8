//! Quality-targeting search.
//!
//! Finds the encoder quality setting whose measured score is closest to a
//! target, by binary search over the encoder's quality range. Measurements
//! are expensive (a full encode, decode and score), so every probe is cached
//! in a [`SearchSession`] scoped to one source.
//!
//! ## Key Types
//!
//! - [`EncoderSpec`]: Quality range and sweep settings of an encoder
//! - [`Measure`]: The live measurement collaborator
//! - [`SearchSession`]: Per-source probe cache

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// Half-open range of quality settings `[lo, hi)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityRange {
    /// Lowest setting, inclusive.
    pub lo: i32,
    /// Highest setting, exclusive.
    pub hi: i32,
}

impl QualityRange {
    /// Create a range.
    #[must_use]
    pub fn new(lo: i32, hi: i32) -> Self {
        Self { lo, hi }
    }

    /// Number of settings in the range.
    #[must_use]
    pub fn width(&self) -> i64 {
        i64::from(self.hi) - i64::from(self.lo)
    }

    /// Floor of the midpoint, computed without overflowing `i32`.
    #[must_use]
    pub fn midpoint(&self) -> i32 {
        self.lo + (self.width() / 2) as i32
    }
}

/// Encoder preset.
///
/// Quality settings are always arranged so that higher is better; encoders
/// whose native parameter runs the other way are flagged with
/// `inverted_native` and converted by [`EncoderSpec::native_setting`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderSpec {
    /// Encoder name.
    pub name: String,
    /// Range searched by [`SearchSession::search_quality`].
    pub search_range: QualityRange,
    /// Quality settings used for a full curve sweep, highest first.
    pub sweep_qualities: Vec<i32>,
    /// Native parameter is `search_range.hi - quality` instead of `quality`.
    pub inverted_native: bool,
    /// Default speed preset, if the encoder has one.
    pub speed: Option<u32>,
}

/// Names of the built-in encoder presets.
pub const BUILTIN_ENCODERS: &[&str] = &["aom", "svt", "rav1e", "tinyavif", "jpegxl", "jpegli", "webp"];

impl EncoderSpec {
    /// Look up a built-in preset by name.
    pub fn builtin(name: &str) -> Result<Self> {
        const AV1: &[i32] = &[99, 95, 85, 75, 65, 55, 45, 35, 25, 15];
        const JPEG: &[i32] = &[100, 95, 85, 75, 65, 55, 45, 35, 25, 15, 5];

        let percent = QualityRange::new(0, 101);
        let spec = |sweep: &[i32], range: QualityRange, inverted_native: bool, speed: Option<u32>| Self {
            name: name.to_string(),
            search_range: range,
            sweep_qualities: sweep.to_vec(),
            inverted_native,
            speed,
        };

        match name {
            "aom" | "rav1e" => Ok(spec(AV1, percent, false, Some(6))),
            "svt" => Ok(spec(&[AV1, &[5][..]].concat(), percent, false, Some(6))),
            // qindex = 255 - quality; quality 255 (qindex 0) is lossless and unsupported
            "tinyavif" => Ok(spec(
                &[65, 90, 115, 140, 165, 190, 215, 240, 254],
                QualityRange::new(0, 255),
                true,
                None,
            )),
            "jpegxl" => Ok(spec(&[AV1, &[5, 0][..]].concat(), percent, false, Some(7))),
            "jpegli" => Ok(spec(JPEG, percent, false, None)),
            "webp" => Ok(spec(JPEG, percent, false, Some(4))),
            _ => Err(Error::UnknownEncoder(name.to_string())),
        }
    }

    /// All built-in presets.
    #[must_use]
    pub fn builtins() -> Vec<Self> {
        BUILTIN_ENCODERS
            .iter()
            .filter_map(|name| Self::builtin(name).ok())
            .collect()
    }

    /// Encoder-native parameter for a quality setting.
    #[must_use]
    pub fn native_setting(&self, quality: i32) -> i32 {
        if self.inverted_native {
            self.search_range.hi - quality
        } else {
            quality
        }
    }
}

/// Result of one live measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchMeasurement {
    /// Encoded size in bytes.
    pub size_bytes: u64,
    /// Encode runtime in seconds.
    pub runtime_seconds: f64,
    /// Quality score of the decoded output.
    pub score: f64,
}

/// Live measurement collaborator: encodes, decodes and scores one setting.
pub trait Measure {
    /// Measure `encoder` at `quality`.
    fn measure(&mut self, encoder: &EncoderSpec, quality: i32) -> Result<SearchMeasurement>;
}

impl<F> Measure for F
where
    F: FnMut(&EncoderSpec, i32) -> Result<SearchMeasurement>,
{
    fn measure(&mut self, encoder: &EncoderSpec, quality: i32) -> Result<SearchMeasurement> {
        self(encoder, quality)
    }
}

/// Outcome of a quality search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Encoder searched.
    pub encoder: String,
    /// Score that was targeted.
    pub target_score: f64,
    /// Best quality setting found.
    pub quality: i32,
    /// Encoder-native parameter for `quality`.
    pub native_setting: i32,
    /// Measurement at `quality`.
    pub measurement: SearchMeasurement,
}

/// Probe cache for searches on one source.
///
/// Quality-to-score mappings depend on the source, so a session must never
/// be reused for a different source.
#[derive(Debug, Clone)]
pub struct SearchSession {
    source: String,
    cache: HashMap<(String, i32), SearchMeasurement>,
    calls: usize,
}

impl SearchSession {
    /// Start a session for `source`.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            cache: HashMap::new(),
            calls: 0,
        }
    }

    /// Source this session belongs to.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of live measurements performed so far.
    #[must_use]
    pub fn measure_calls(&self) -> usize {
        self.calls
    }

    /// Number of cached probes.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Binary-search `encoder`'s range for the setting closest to `target_score`.
    ///
    /// Assumes the score does not decrease with quality. The closest probe
    /// seen is returned even if the final bracket ends elsewhere, since real
    /// encoders are not perfectly monotonic.
    pub fn search_quality<M>(
        &mut self,
        encoder: &EncoderSpec,
        target_score: f64,
        measure: &mut M,
    ) -> Result<SearchOutcome>
    where
        M: Measure + ?Sized,
    {
        let mut range = encoder.search_range;
        if range.width() < 2 {
            return Err(Error::InvalidQualityRange {
                encoder: encoder.name.clone(),
                lo: range.lo,
                hi: range.hi,
            });
        }

        let mut best: Option<(f64, i32, SearchMeasurement)> = None;

        while range.width() > 1 {
            let mid = range.midpoint();
            let m = self.probe(encoder, mid, measure)?;

            let diff = (m.score - target_score).abs();
            if best.is_none_or(|(best_diff, _, _)| diff < best_diff) {
                best = Some((diff, mid, m));
            }

            if m.score > target_score {
                range.hi = mid;
            } else {
                range.lo = mid;
            }
        }

        let (_, quality, measurement) = best.ok_or_else(|| Error::InvalidQualityRange {
            encoder: encoder.name.clone(),
            lo: range.lo,
            hi: range.hi,
        })?;

        debug!(
            source = %self.source,
            encoder = %encoder.name,
            target_score,
            quality,
            score = measurement.score,
            calls = self.calls,
            "quality search finished"
        );

        Ok(SearchOutcome {
            encoder: encoder.name.clone(),
            target_score,
            quality,
            native_setting: encoder.native_setting(quality),
            measurement,
        })
    }

    /// Search for each of `targets` in turn, sharing the cache.
    pub fn build_table<M>(
        &mut self,
        encoder: &EncoderSpec,
        targets: &[f64],
        measure: &mut M,
    ) -> Result<Vec<SearchOutcome>>
    where
        M: Measure + ?Sized,
    {
        targets
            .iter()
            .map(|&target| self.search_quality(encoder, target, measure))
            .collect()
    }

    fn probe<M>(&mut self, encoder: &EncoderSpec, quality: i32, measure: &mut M) -> Result<SearchMeasurement>
    where
        M: Measure + ?Sized,
    {
        let key = (encoder.name.clone(), quality);
        if let Some(&m) = self.cache.get(&key) {
            trace!(encoder = %encoder.name, quality, score = m.score, "probe (cached)");
            return Ok(m);
        }

        let m = measure.measure(encoder, quality)?;
        self.calls += 1;
        if !m.score.is_finite() {
            return Err(Error::Measure {
                encoder: encoder.name.clone(),
                quality,
                message: format!("non-finite score {}", m.score),
            });
        }

        trace!(encoder = %encoder.name, quality, score = m.score, size = m.size_bytes, "probe");
        self.cache.insert(key, m);
        Ok(m)
    }
}

/// Search with a fresh single-use session.
pub fn search_quality<M>(
    source: &str,
    encoder: &EncoderSpec,
    target_score: f64,
    measure: &mut M,
) -> Result<SearchOutcome>
where
    M: Measure + ?Sized,
{
    SearchSession::new(source).search_quality(encoder, target_score, measure)
}
