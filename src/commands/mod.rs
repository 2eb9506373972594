//! Command Handlers Module
//!
//! This module contains handlers for all CLI subcommands. Device work is
//! blocking and runs on the tokio blocking pool.

pub mod check;
pub mod dump;
pub mod generations;
pub mod info;
pub mod position;
pub mod tree;

use std::io::Read;

use tracing::{error, info, warn};

use crate::config::ReaderConfig;
use crate::error::{Result, RustLtfsError};
use crate::ltfs::{self, OpenError, Volume};
use crate::scsi::{Drive, Passthrough};
use crate::tape_ops::{TapeControl, TapeOps};

/// Run `job` on the blocking pool
pub(crate) async fn blocking<T, F>(job: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| RustLtfsError::Generic(e.into()))?
}

/// Open the tape node and apply the configured st driver options
pub(crate) fn open_drive(device: &str, config: &ReaderConfig) -> Result<Drive> {
    let drive = Drive::open(device)?;
    if config.apply_drive_options {
        let options = config.drive_options()?;
        info!("Setting drive options: {}", options.names().join(","));
        drive.set_options(options)?;
    }
    Ok(drive)
}

/// One-line stdout notice for a volume whose index scan stopped early
pub(crate) fn partial_notice(volume: &Volume, source: &RustLtfsError) -> String {
    format!(
        "Note: partial index scan, {} generation(s) read, latest {} may be stale ({})",
        volume.generations.len(),
        volume.latest_index().generation_number,
        source
    )
}

/// Open the volume, accepting a partially scanned index partition
pub(crate) fn open_volume<D>(device: &mut D, name: &str, config: &ReaderConfig) -> Result<Volume>
where
    D: Passthrough + TapeControl + Read,
{
    match ltfs::open(device, &config.open_options()) {
        Ok(volume) => Ok(volume),
        Err(OpenError::Partial { volume, source }) => {
            warn!(
                "Index scan incomplete, using {} generation(s) found: {}",
                volume.generations.len(),
                source
            );
            println!("{}", partial_notice(&volume, &source));
            Ok(*volume)
        }
        Err(OpenError::NotLtfs(err)) => {
            error!("{} does not hold an LTFS volume", name);
            Err(err)
        }
        Err(OpenError::Device(err)) => Err(err),
    }
}

/// Everything a volume-level command needs, opened on the blocking pool
pub(crate) async fn load_volume(device: String, config: ReaderConfig) -> Result<Volume> {
    blocking(move || {
        let mut drive = open_drive(&device, &config)?;
        open_volume(&mut drive, &device, &config)
    })
    .await
}
