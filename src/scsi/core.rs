//! SCSI Core Implementation
//!
//! This module contains the ScsiInterface struct and the three transfer
//! flavours built on the single passthrough primitive.

use crate::error::{Result, RustLtfsError};
use tracing::{debug, warn};

use super::constants::SENSE_BUFFER_LEN;
use super::sense::SenseData;
use super::types::{CommandBlock, DataDirection, Timeouts};

/// Raw result of one passthrough request
#[derive(Debug)]
pub struct PassthroughOutcome {
    pub os_error: Option<std::io::Error>,
    pub sense: [u8; SENSE_BUFFER_LEN],
    /// Number of sense bytes the device actually wrote
    pub sense_len: usize,
    /// `transfer_len - actually transferred`
    pub resid: i32,
    pub status: u8,
    pub host_status: u16,
    pub driver_status: u16,
}

impl PassthroughOutcome {
    pub fn ok() -> Self {
        Self {
            os_error: None,
            sense: [0u8; SENSE_BUFFER_LEN],
            sense_len: 0,
            resid: 0,
            status: 0,
            host_status: 0,
            driver_status: 0,
        }
    }

    /// Sense data if the device reported any
    pub fn sense_data(&self) -> Option<SenseData> {
        if self.sense_len != 0 && self.sense[0] != 0 {
            Some(SenseData::from_bytes(&self.sense[..self.sense_len]))
        } else {
            None
        }
    }
}

/// The SG_IO-style passthrough primitive.
pub trait Passthrough {
    /// Issue `cmd` moving `data` in `direction`.
    fn passthrough(
        &self,
        cmd: &CommandBlock,
        direction: DataDirection,
        data: &mut [u8],
    ) -> PassthroughOutcome;
}

impl<P: Passthrough + ?Sized> Passthrough for &P {
    fn passthrough(
        &self,
        cmd: &CommandBlock,
        direction: DataDirection,
        data: &mut [u8],
    ) -> PassthroughOutcome {
        (**self).passthrough(cmd, direction, data)
    }
}

/// SCSI operation structure that encapsulates low-level SCSI commands
pub struct ScsiInterface<P> {
    pub(crate) device: P,
    pub(crate) timeouts: Timeouts,
}

impl<P: Passthrough> ScsiInterface<P> {
    pub fn new(device: P) -> Self {
        Self {
            device,
            timeouts: Timeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    pub fn device(&self) -> &P {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut P {
        &mut self.device
    }

    pub fn into_inner(self) -> P {
        self.device
    }

    /// Control-only command, no data phase
    pub fn execute(&self, cmd: CommandBlock) -> Result<()> {
        let outcome = self.device.passthrough(&cmd, DataDirection::None, &mut []);
        Self::finish(&cmd, outcome).map(|_| ())
    }

    /// Device-to-host transfer of at most `cmd.transfer_len()` bytes.
    ///
    /// The returned buffer is trimmed by the residual count the device reports.
    pub fn execute_read(&self, cmd: CommandBlock) -> Result<Vec<u8>> {
        let max_len = cmd.transfer_len() as usize;
        let mut buffer = vec![0u8; max_len];
        let outcome = self
            .device
            .passthrough(&cmd, DataDirection::FromDevice, &mut buffer);
        let resid = Self::finish(&cmd, outcome)?;

        let received = max_len.saturating_sub(resid.max(0) as usize);
        buffer.truncate(received);
        Ok(buffer)
    }

    /// Host-to-device transfer of `payload`
    pub fn execute_write(&self, cmd: CommandBlock, payload: &[u8]) -> Result<()> {
        let mut buffer = payload.to_vec();
        let outcome = self
            .device
            .passthrough(&cmd, DataDirection::ToDevice, &mut buffer);
        Self::finish(&cmd, outcome).map(|_| ())
    }

    /// Sense data wins over the OS result; returns the residual count on success
    fn finish(cmd: &CommandBlock, outcome: PassthroughOutcome) -> Result<i32> {
        if let Some(sense) = outcome.sense_data() {
            warn!(
                "scsi: cmd={} status={:#x} host={} driver={} resid={} sb={}",
                hex::encode(cmd.cdb()),
                outcome.status,
                outcome.host_status,
                outcome.driver_status,
                outcome.resid,
                hex::encode(sense.as_bytes())
            );
            return Err(RustLtfsError::Sense(sense));
        }
        if let Some(err) = outcome.os_error {
            debug!("scsi: cmd={} failed: {}", hex::encode(cmd.cdb()), err);
            return Err(RustLtfsError::Io(err));
        }
        Ok(outcome.resid)
    }
}
