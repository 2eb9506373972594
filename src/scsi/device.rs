//! SCSI Device Management
//!
//! This module handles opening the tape node and wires its file descriptor
//! into both control paths: SG_IO passthrough and MTIO tape operations.

use crate::error::Result;
use std::fs::{File, OpenOptions};
use std::io::Read;
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use tracing::debug;

use super::core::{Passthrough, PassthroughOutcome};
use super::ffi;
use super::types::{CommandBlock, DataDirection};
use crate::tape_ops::mtio::{self, MtRequest, MtStatus, TapeControl};

/// Open tape device; owns the descriptor for the whole session.
///
/// Deliberately not `Clone`: tape position is shared state of the handle.
#[derive(Debug)]
pub struct Drive {
    file: File,
    device_path: String,
}

impl Drive {
    /// Open the tape node read-write with close-on-exec
    pub fn open(device_path: &str) -> Result<Self> {
        debug!("Opening tape device: {}", device_path);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_CLOEXEC)
            .open(device_path)?;

        debug!("Device opened successfully: {}", device_path);
        Ok(Self {
            file,
            device_path: device_path.to_string(),
        })
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    pub fn raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl Passthrough for Drive {
    fn passthrough(
        &self,
        cmd: &CommandBlock,
        direction: DataDirection,
        data: &mut [u8],
    ) -> PassthroughOutcome {
        ffi::issue(self.raw_fd(), cmd, direction, data)
    }
}

impl TapeControl for Drive {
    fn tape_op(&self, request: MtRequest) -> std::io::Result<()> {
        mtio::ioctl_tape_op(self.raw_fd(), request)
    }

    fn tape_status(&self) -> std::io::Result<MtStatus> {
        mtio::ioctl_tape_status(self.raw_fd())
    }

    fn tape_position(&self) -> std::io::Result<i64> {
        mtio::ioctl_tape_position(self.raw_fd())
    }
}

impl Read for Drive {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

impl Drop for Drive {
    fn drop(&mut self) {
        debug!("Device handle closed: {}", self.device_path);
    }
}
