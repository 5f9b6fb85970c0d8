//! Resolution ladder command.

use std::path::Path;

use anyhow::{Result, bail};
use codec_rd::ResolutionDescriptor;

use crate::GridArgs;
use crate::commands::load_config;

pub fn run(width: u32, height: u32, config_path: Option<&Path>) -> Result<()> {
    if width == 0 || height == 0 {
        bail!("Source dimensions must be non-zero, got {}x{}", width, height);
    }
    let config = load_config(config_path, &GridArgs::default())?;

    println!("{:<8} {:>8} {:>8} {:>12}", "Index", "Width", "Height", "Pixels");
    println!("{:-<40}", "");
    for r in ResolutionDescriptor::ladder(width, height, &config.ladder_sizes) {
        println!(
            "{:<8} {:>8} {:>8} {:>12}",
            r.resolution_index,
            r.width,
            r.height,
            r.num_pixels()
        );
    }

    Ok(())
}
