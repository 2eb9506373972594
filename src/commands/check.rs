//! Check Command Handler
//!
//! Handles the `check` subcommand: is the drive ready, is the medium
//! partitioned for LTFS and how much room is left.

use crate::config::ReaderConfig;
use crate::display;
use crate::error::Result;
use crate::scsi::{Drive, ScsiInterface};
use tracing::{info, warn};

pub async fn execute(device: String, config: ReaderConfig) -> Result<()> {
    info!("Checking tape: {}", device);

    super::blocking(move || {
        let drive = Drive::open(&device)?;
        let scsi = ScsiInterface::new(&drive).with_timeouts(config.timeouts);

        scsi.test_unit_ready()?;
        println!("Unit ready:     yes");

        scsi.check_partitions()?;
        println!("Partitions:     2");

        match scsi.tape_capacity() {
            Ok(capacity) => {
                println!("Capacity:");
                display::print_capacity(&capacity);
            }
            Err(e) => warn!("Capacity log page unavailable: {}", e),
        }
        Ok(())
    })
    .await
}
