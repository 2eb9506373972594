//! Generations Command Handler
//!
//! Handles the `generations` subcommand: every index found on the index
//! partition, in the order it was read.

use crate::config::ReaderConfig;
use crate::display;
use crate::error::Result;
use tracing::info;

pub async fn execute(device: String, config: ReaderConfig) -> Result<()> {
    info!("Scanning index generations: {}", device);

    let volume = super::load_volume(device, config).await?;
    print!("{}", display::render_generations(&volume));
    println!();
    println!(
        "Latest generation: {} (marked *)",
        volume.latest_index().generation_number
    );

    Ok(())
}
