//! Aggregated curves command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use codec_rd::{CurveBuilder, CurveReport, LabelCurves};

use crate::commands::{load_config, load_store, write_json};
use crate::{DataArgs, GridArgs};

/// Scores printed in the summary table.
const SUMMARY_SCORES: [f64; 4] = [40.0, 60.0, 70.0, 80.0];

pub fn run(
    data: &DataArgs,
    grid: &GridArgs,
    config_path: Option<&Path>,
    labels: Vec<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config_path, grid)?;
    let store = load_store(data)?;

    let labels = if labels.is_empty() { store.labels() } else { labels };
    if labels.is_empty() {
        bail!("No labels found in {}", data.results.display());
    }

    let sources: Vec<String> = store.shared_sources(labels.as_slice())?.into_iter().collect();
    println!("{} label(s), {} shared source(s)", labels.len(), sources.len());
    println!();

    let builder = CurveBuilder::new(config.grid()?);
    let mut report = CurveReport::new("curves", config);

    for label in &labels {
        let curves = LabelCurves::build(&store, &store, &builder, label, &sources)
            .with_context(|| format!("Failed to build curves for {label}"))?;
        print_label(&curves);
        report.labels.push(curves);
    }

    if let Some(output_path) = output {
        write_json(&report, &output_path)?;
    }

    Ok(())
}

fn print_label(curves: &LabelCurves) {
    println!("{}:", curves.label);
    print!("  {:<10}", "Curve");
    for score in SUMMARY_SCORES {
        print!(" {:>14}", format!("bpp@{score:.0}"));
    }
    println!();
    println!("  {:-<70}", "");

    for slot in &curves.curves {
        print!("  {:<10}", slot.slot.to_string());
        for score in SUMMARY_SCORES {
            match slot.curve.sample(score) {
                Some(point) => print!(" {:>14.4}", point.bpp),
                None => print!(" {:>14}", "-"),
            }
        }
        println!();
    }
    println!();
}
