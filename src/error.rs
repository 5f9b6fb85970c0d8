//! Error types for codec-rd operations.

use thiserror::Error;

/// Result type alias for codec-rd operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or comparing rate-distortion curves.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No measurements exist for a required (label, source, resolution) key.
    #[error("No encodes found under label {label} for {source_name} at resolution {resolution_index}")]
    NoDataForKey {
        /// Encode set label.
        label: String,
        /// Source name.
        source_name: String,
        /// Resolution index that had no data.
        resolution_index: u32,
    },

    /// The measured scores do not bracket the requested quality range.
    #[error(
        "Scores for (label={label}, source={source_name}, resolution={resolution_index}) don't cover a wide enough range: \
         covered [{available_lo:.1}, {available_hi:.1}] vs. expected [{requested_lo:.1}, {requested_hi:.1}]"
    )]
    InsufficientQualityRange {
        /// Encode set label.
        label: String,
        /// Source name.
        source_name: String,
        /// Resolution index of the offending data.
        resolution_index: u32,
        /// Lower bound of the requested range.
        requested_lo: f64,
        /// Upper bound of the requested range.
        requested_hi: f64,
        /// Lowest score available.
        available_lo: f64,
        /// Highest score available.
        available_hi: f64,
    },

    /// Multires merge left grid points without a value.
    ///
    /// This indicates a logic bug: resolution 0 always covers the full grid
    /// once its same-res range check has passed.
    #[error(
        "Internal error: multires curve for (label={label}, source={source_name}) has no data at {missing} grid point(s), first at score {first_missing_score:.2}"
    )]
    IncompleteMultiresCoverage {
        /// Encode set label.
        label: String,
        /// Source name.
        source_name: String,
        /// Number of uncovered grid points.
        missing: usize,
        /// Score of the first uncovered grid point.
        first_missing_score: f64,
    },

    /// A measurement has a zero or negative size or runtime, or a non-finite score.
    #[error(
        "Invalid measurement for (label={label}, source={source_name}, resolution={resolution_index}, quality={quality_setting}): {reason}"
    )]
    NonPositiveMeasurement {
        /// Encode set label.
        label: String,
        /// Source name.
        source_name: String,
        /// Resolution index.
        resolution_index: u32,
        /// Encoder-native quality setting.
        quality_setting: i32,
        /// Which field was invalid.
        reason: String,
    },

    /// A full-resolution measurement reports different same-res and full-res scores.
    #[error(
        "Full-resolution measurement for (label={label}, source={source_name}, quality={quality_setting}) has same-res score {same_res_score} but full-res score {full_res_score}"
    )]
    InconsistentFullResScore {
        /// Encode set label.
        label: String,
        /// Source name.
        source_name: String,
        /// Encoder-native quality setting.
        quality_setting: i32,
        /// Score against the source at its own resolution.
        same_res_score: f64,
        /// Score against the full-resolution source.
        full_res_score: f64,
    },

    /// A measurement does not belong to the resolution it was supplied for.
    #[error(
        "Measurement for {source_name} claims resolution {actual_index} ({actual_width}x{actual_height}) but was supplied for resolution {expected_index}"
    )]
    ResolutionMismatch {
        /// Source name.
        source_name: String,
        /// Resolution index the caller asked for.
        expected_index: u32,
        /// Resolution index on the measurement.
        actual_index: u32,
        /// Width on the measurement.
        actual_width: u32,
        /// Height on the measurement.
        actual_height: u32,
    },

    /// The resolution catalog for a source is unusable.
    #[error("Invalid resolution list for {source_name}: {reason}")]
    InvalidResolutions {
        /// Source name.
        source_name: String,
        /// Reason for the failure.
        reason: String,
    },

    /// Control points passed to the interpolator are unusable.
    #[error("Invalid interpolation input: {0}")]
    InvalidInterpolationInput(String),

    /// Interpolation failed while building one resolution's curves.
    #[error(
        "Interpolation failed for (label={label}, source={source_name}, resolution={resolution_index}) on the {pass} curve: {reason}"
    )]
    InterpolationFailed {
        /// Encode set label.
        label: String,
        /// Source name.
        source_name: String,
        /// Resolution index being built.
        resolution_index: u32,
        /// Which curve failed, `same-res` or `full-res`.
        pass: &'static str,
        /// Underlying interpolator error.
        reason: String,
    },

    /// Two curves that must share a grid do not.
    #[error("Grid mismatch: expected {expected} points over [{expected_lo}, {expected_hi}], got {actual} points")]
    GridMismatch {
        /// Expected number of grid points.
        expected: usize,
        /// Expected lowest score.
        expected_lo: f64,
        /// Expected highest score.
        expected_hi: f64,
        /// Actual number of grid points.
        actual: usize,
    },

    /// A comparison interval extends beyond a curve's score range.
    #[error("Interval [{lo}, {hi}] is outside the curve's score range [{curve_lo}, {curve_hi}]")]
    IntervalOutOfRange {
        /// Requested lower bound.
        lo: f64,
        /// Requested upper bound.
        hi: f64,
        /// Lowest score on the curve.
        curve_lo: f64,
        /// Highest score on the curve.
        curve_hi: f64,
    },

    /// Aggregation was asked to average zero curves.
    #[error("Cannot aggregate an empty set of curves")]
    EmptyAggregate,

    /// No sources were encoded under every selected label.
    #[error("No shared sources between all selected labels {labels:?}")]
    NoSharedSources {
        /// Labels that were intersected.
        labels: Vec<String>,
    },

    /// A measurement with the same key was already recorded.
    #[error(
        "Duplicate measurement for (label={label}, source={source_name}, resolution={resolution_index}, quality={quality_setting})"
    )]
    DuplicateMeasurement {
        /// Encode set label.
        label: String,
        /// Source name.
        source_name: String,
        /// Resolution index.
        resolution_index: u32,
        /// Encoder-native quality setting.
        quality_setting: i32,
    },

    /// Quality search range is too narrow to search.
    #[error("Invalid quality range for {encoder}: [{lo}, {hi}) must contain at least two settings")]
    InvalidQualityRange {
        /// Encoder name.
        encoder: String,
        /// Inclusive lower bound.
        lo: i32,
        /// Exclusive upper bound.
        hi: i32,
    },

    /// Unknown encoder preset name.
    #[error("Unknown encoder: {0}")]
    UnknownEncoder(String),

    /// Error from the external measurement collaborator.
    #[error("Measurement failed ({encoder} at quality {quality}): {message}")]
    Measure {
        /// Encoder name.
        encoder: String,
        /// Quality setting that was being measured.
        quality: i32,
        /// Message from the collaborator.
        message: String,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error importing CSV data.
    #[error("CSV import error at line {line}: {reason}")]
    CsvImport {
        /// Line number where the error occurred.
        line: usize,
        /// Reason for the failure.
        reason: String,
    },

    /// I/O error wrapper.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
