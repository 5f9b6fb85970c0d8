//! Subcommand implementations.

pub mod compare;
pub mod curves;
pub mod ladder;
pub mod plan;
pub mod search;

use std::path::Path;

use anyhow::{Context, Result};
use codec_rd::import::CsvImporter;
use codec_rd::{CurveConfig, DeltaIntegration, MeasurementStore};

use crate::{DataArgs, GridArgs};

/// Load the configuration file, if any, and apply grid overrides.
pub fn load_config(path: Option<&Path>, grid: &GridArgs) -> Result<CurveConfig> {
    let mut config = match path {
        Some(path) => CurveConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => CurveConfig::default(),
    };

    if let Some(lo) = grid.score_lo {
        config.score_lo = lo;
    }
    if let Some(hi) = grid.score_hi {
        config.score_hi = hi;
    }
    if let Some(steps) = grid.steps {
        config.score_steps = steps;
    }
    if let Some(rule) = &grid.integration {
        config.integration = rule.parse::<DeltaIntegration>()?;
    }

    config.validate()?;
    tracing::debug!(?config, "using configuration");
    Ok(config)
}

/// Import the sources and results tables.
pub fn load_store(data: &DataArgs) -> Result<MeasurementStore> {
    let store = CsvImporter::auto_detect()
        .load(&data.sources, &data.results)
        .with_context(|| {
            format!(
                "Failed to import {} and {}",
                data.sources.display(),
                data.results.display()
            )
        })?;
    tracing::info!(measurements = store.len(), labels = store.labels().len(), "loaded results");
    Ok(store)
}

/// Write any serializable value as pretty JSON.
pub fn write_json<T: serde::Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write to {}", path.display()))?;
    println!("Saved to: {}", path.display());
    Ok(())
}
