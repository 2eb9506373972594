//! Info Command Handler
//!
//! Handles the `info` subcommand: labels and the latest index summary.

use crate::config::ReaderConfig;
use crate::display;
use crate::error::Result;
use tracing::info;

pub async fn execute(device: String, config: ReaderConfig) -> Result<()> {
    info!("Reading volume information: {}", device);

    let volume = super::load_volume(device, config).await?;
    display::print_volume(&volume);

    Ok(())
}
