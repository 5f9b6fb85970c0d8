//! Offline quality-table search command.
//!
//! Runs the quality search against a table of already-measured settings, so
//! a quality table can be built from a dense sweep without re-encoding.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use codec_rd::search::SearchMeasurement;
use codec_rd::{EncoderSpec, Error, SearchSession};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(alias = "q")]
    quality: i32,
    #[serde(alias = "bytes")]
    size: u64,
    #[serde(alias = "time")]
    runtime: f64,
    #[serde(alias = "ssimu2")]
    score: f64,
}

pub fn run(
    input: PathBuf,
    encoder: &str,
    targets: &[f64],
    source: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let spec = EncoderSpec::builtin(encoder)?;

    let mut reader = csv::Reader::from_path(&input)
        .with_context(|| format!("Failed to open {}", input.display()))?;
    let mut table: HashMap<i32, SearchMeasurement> = HashMap::new();
    for row in reader.deserialize::<Row>() {
        let row = row.with_context(|| format!("Failed to parse {}", input.display()))?;
        table.insert(
            row.quality,
            SearchMeasurement {
                size_bytes: row.size,
                runtime_seconds: row.runtime,
                score: row.score,
            },
        );
    }
    if table.is_empty() {
        bail!("No measurements in {}", input.display());
    }

    let mut lookup = |e: &EncoderSpec, quality: i32| {
        table.get(&quality).copied().ok_or_else(|| Error::Measure {
            encoder: e.name.clone(),
            quality,
            message: "setting not present in the input table".to_string(),
        })
    };

    let mut session = SearchSession::new(source);
    let outcomes = session.build_table(&spec, targets, &mut lookup)?;

    println!("{:<8} {:>8} {:>8} {:>10} {:>10}", "Target", "Quality", "Native", "Score", "Bytes");
    println!("{:-<50}", "");
    for o in &outcomes {
        println!(
            "{:<8.2} {:>8} {:>8} {:>10.2} {:>10}",
            o.target_score, o.quality, o.native_setting, o.measurement.score, o.measurement.size_bytes
        );
    }
    println!();
    println!("{} probe(s) for {} target(s)", session.measure_calls(), targets.len());

    if let Some(output_path) = output {
        crate::commands::write_json(&outcomes, &output_path)?;
    }

    Ok(())
}
