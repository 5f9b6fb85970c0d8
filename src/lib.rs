//! # codec-rd
//!
//! Rate-distortion curve engine for image and video encoder benchmarks.
//!
//! Raw encode measurements (size, runtime and perceptual score per quality
//! setting and resolution) come from an external pipeline. This library turns
//! them into smooth quality-indexed curves of bits per pixel and nanoseconds
//! per pixel, merges resolutions into a best-of envelope, averages across
//! sources, and compares encoders with Bjøntegaard-style deltas.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use codec_rd::{CurveConfig, CurveBuilder, CurveSlot, LabelCurves, import::CsvImporter, stats::delta};
//!
//! let config = CurveConfig::default();
//! let store = CsvImporter::auto_detect().load("sources.csv", "results.csv")?;
//! let sources: Vec<String> = store.shared_sources(&["aom", "svt"])?.into_iter().collect();
//!
//! let builder = CurveBuilder::new(config.grid()?);
//! let aom = LabelCurves::build(&store, &store, &builder, "aom", &sources)?;
//! let svt = LabelCurves::build(&store, &store, &builder, "svt", &sources)?;
//!
//! let d = delta(
//!     aom.get(CurveSlot::Multires).unwrap(),
//!     svt.get(CurveSlot::Multires).unwrap(),
//!     50.0,
//!     80.0,
//!     &config,
//! )?;
//! println!("svt vs aom: {:+.2}% size, {:+.2}% time", d.rate_pct, d.runtime_pct);
//! ```
//!
//! ## Modules
//!
//! - [`error`]: Error types for the library
//! - [`config`]: Grid and comparison configuration
//! - [`interpolation`]: Monotone PCHIP interpolation
//! - [`measurement`]: Measurements, resolutions and the provider traits
//! - [`curve`]: Curve building, multires merge and aggregation
//! - [`stats`]: Deltas, representative points and comparison matrices
//! - [`search`]: Quality-targeting binary search
//! - [`import`]: CSV import of encode results
//! - [`report`]: JSON reports

pub mod config;
pub mod curve;
pub mod error;
pub mod import;
pub mod interpolation;
pub mod measurement;
pub mod report;
pub mod search;
pub mod stats;

// Re-export commonly used types
pub use config::{CurveConfig, DeltaIntegration, QualityGrid};
pub use curve::{
    Curve, CurveBuilder, CurveSlot, LabelCurves, MultiresCurve, PartialCurve, ResolutionCurves,
    SourceCurves, aggregate, build_curve, merge_multires,
};
pub use error::{Error, Result};
pub use interpolation::{Interpolator, Pchip};
pub use measurement::{
    Measurement, MeasurementProvider, MeasurementStore, ResolutionCatalog, ResolutionDescriptor,
    SourceKey,
};
pub use report::CurveReport;
pub use search::{EncoderSpec, Measure, SearchOutcome, SearchSession, search_quality};
pub use stats::{ComparisonMatrix, Delta, Representative, delta};
