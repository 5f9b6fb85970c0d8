//! Pairwise comparison command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use codec_rd::{ComparisonMatrix, CurveBuilder, CurveReport, CurveSlot, LabelCurves};

use crate::commands::{load_config, load_store, write_json};
use crate::{DataArgs, GridArgs};

#[allow(clippy::too_many_arguments)]
pub fn run(
    data: &DataArgs,
    grid: &GridArgs,
    config_path: Option<&Path>,
    labels: &[String],
    lo: f64,
    hi: f64,
    slot: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    if labels.len() < 2 {
        bail!("Need at least two labels to compare, got {}", labels.len());
    }
    let slot: CurveSlot = slot.parse()?;
    let config = load_config(config_path, grid)?;
    let store = load_store(data)?;

    let sources: Vec<String> = store.shared_sources(labels)?.into_iter().collect();
    tracing::info!(sources = sources.len(), "comparing on shared sources");

    let builder = CurveBuilder::new(config.grid()?);
    let curves = labels
        .iter()
        .map(|label| {
            LabelCurves::build(&store, &store, &builder, label, &sources)
                .with_context(|| format!("Failed to build curves for {label}"))
        })
        .collect::<Result<Vec<_>>>()?;

    let matrix = ComparisonMatrix::build(&curves, slot, lo, hi, &config)
        .with_context(|| format!("Failed to compare over [{lo}, {hi}]"))?;

    println!(
        "Comparing {} curves over scores [{lo}, {hi}] on {} source(s)",
        slot,
        sources.len()
    );
    println!();

    print_representatives(&matrix);
    println!();
    print_deltas(&matrix);

    if let Some(output_path) = output {
        let mut report = CurveReport::new("compare", config);
        report.labels = curves;
        report.comparisons.push(matrix);
        write_json(&report, &output_path)?;
    }

    Ok(())
}

fn print_representatives(matrix: &ComparisonMatrix) {
    println!("{:<15} {:>10} {:>12}", "Label", "BPP", "ns/pixel");
    println!("{:-<40}", "");
    for (label, rep) in matrix.labels.iter().zip(&matrix.representatives) {
        match rep {
            Some(rep) => println!("{:<15} {:>10.4} {:>12.2}", label, rep.bpp(), rep.nspp()),
            None => println!("{:<15} {:>10} {:>12}", label, "-", "-"),
        }
    }
}

fn print_deltas(matrix: &ComparisonMatrix) {
    println!("Size / runtime change of column vs. row:");
    print!("{:<15}", "");
    for label in &matrix.labels {
        print!(" {:>20}", label);
    }
    println!();

    for (reference, row) in matrix.labels.iter().zip(&matrix.deltas) {
        print!("{:<15}", reference);
        for delta in row {
            let cell = delta.map_or("-".to_string(), |d| {
                format!("{:+.2}% / {:+.2}%", d.rate_pct, d.runtime_pct)
            });
            print!(" {:>20}", cell);
        }
        println!();
    }
}
