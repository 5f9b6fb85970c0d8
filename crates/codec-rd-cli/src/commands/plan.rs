//! Missing-encode planning command.

use anyhow::Result;
use codec_rd::EncoderSpec;

use crate::DataArgs;
use crate::commands::load_store;

pub fn run(data: &DataArgs, label: &str, encoder: &str, source: Option<&str>) -> Result<()> {
    let spec = EncoderSpec::builtin(encoder)?;
    let store = load_store(data)?;

    let sources: Vec<String> = match source {
        Some(s) => vec![s.to_string()],
        None => store.sources(label).into_iter().collect(),
    };

    println!("{:<20} {:>6} {:>12} {:>8} {:>8}", "Source", "Res", "Size", "Quality", "Native");
    println!("{:-<60}", "");

    let mut total = 0;
    for source in &sources {
        for encode in store.plan_encodes(label, source, &spec.sweep_qualities)? {
            println!(
                "{:<20} {:>6} {:>12} {:>8} {:>8}",
                source,
                encode.resolution.resolution_index,
                format!("{}x{}", encode.resolution.width, encode.resolution.height),
                encode.quality_setting,
                spec.native_setting(encode.quality_setting)
            );
            total += 1;
        }
    }

    println!();
    println!("{} encode(s) to run for {} ({})", total, label, spec.name);
    Ok(())
}
