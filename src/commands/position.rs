//! Position Command Handler
//!
//! Handles the `position` subcommand: READ POSITION next to the st
//! driver's own idea of where the tape is.

use crate::config::ReaderConfig;
use crate::display;
use crate::error::Result;
use crate::scsi::{Drive, ScsiInterface};
use crate::tape_ops::TapeOps;
use tracing::info;

pub async fn execute(device: String, config: ReaderConfig) -> Result<()> {
    info!("Querying tape position: {}", device);

    super::blocking(move || {
        let drive = Drive::open(&device)?;
        let scsi = ScsiInterface::new(&drive).with_timeouts(config.timeouts);

        let position = scsi.read_position()?;
        let status = drive.status()?;
        let block = drive.block_position()?;
        display::print_position(&position, &status, block);
        Ok(())
    })
    .await
}
