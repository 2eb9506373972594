//! SCSI Positioning Commands
//!
//! This module contains commands for positioning the tape: LOCATE(10),
//! LOCATE(16) and READ POSITION.

use crate::error::{Result, RustLtfsError};
use tracing::debug;

use super::super::{
    constants::*,
    core::{Passthrough, ScsiInterface},
    types::{CommandBlock, PositionData},
};

/// Allocation length of a long-form READ POSITION
const READ_POSITION_ALLOC: u32 = 64;
/// Bytes needed to decode partition, block and file numbers
const READ_POSITION_MIN_LEN: usize = 24;

impl CommandBlock {
    pub fn locate10(flags: u8, partition: u8, block: u32) -> Self {
        let b = block.to_be_bytes();
        Self::new(
            vec![
                scsi_commands::LOCATE_10,
                flags,
                0,
                b[0],
                b[1],
                b[2],
                b[3],
                0,
                partition,
                0,
            ],
            0,
            timeouts::LOCATE_MS,
        )
    }

    pub fn locate16(flags: u8, partition: u8, logical_id: u64) -> Self {
        let mut cdb = vec![scsi_commands::LOCATE_16, flags, 0, partition];
        cdb.extend_from_slice(&logical_id.to_be_bytes());
        cdb.extend_from_slice(&[0, 0, 0, 0]);
        Self::new(cdb, 0, timeouts::LOCATE_MS)
    }

    pub fn read_position() -> Self {
        Self::new(
            vec![
                scsi_commands::READ_POSITION,
                READ_POSITION_LONG_FORM,
                0,
                0,
                0,
                0,
                0,
                0,
                0,
                0,
            ],
            READ_POSITION_ALLOC,
            timeouts::CONTROL_MS,
        )
    }
}

impl<P: Passthrough> ScsiInterface<P> {
    /// Position to a logical block in the current partition
    pub fn locate_block(&self, block: u32) -> Result<()> {
        debug!("Locating to block {}", block);
        self.execute(CommandBlock::locate10(0, 0, block).with_timeout(self.timeouts.locate_ms))
    }

    /// LOCATE(10) with caller flags; pass [`LOCATE10_FLAG_WITH_PART`] to
    /// change partition
    pub fn locate_partition_block(&self, flags: u8, partition: u8, block: u32) -> Result<()> {
        debug!(
            "Locating to partition {} block {} (flags=0x{:02X})",
            partition, block, flags
        );
        self.execute(
            CommandBlock::locate10(flags, partition, block).with_timeout(self.timeouts.locate_ms),
        )
    }

    /// LOCATE(16) to an object, a file or end of data (`LOCATE16_FLAG_*`)
    pub fn locate16(&self, flags: u8, partition: u8, logical_id: u64) -> Result<()> {
        debug!(
            "LOCATE(16): partition={} id={} flags=0x{:02X}",
            partition, logical_id, flags
        );
        self.execute(
            CommandBlock::locate16(flags, partition, logical_id)
                .with_timeout(self.timeouts.locate_ms),
        )
    }

    pub fn read_position(&self) -> Result<PositionData> {
        let data = self.execute_read(
            CommandBlock::read_position().with_timeout(self.timeouts.control_ms),
        )?;
        let position = decode_position(&data)?;
        debug!(
            "Position: partition={}, block={}, file={}",
            position.partition, position.block, position.file
        );
        Ok(position)
    }
}

/// Decode a long-form READ POSITION response
pub fn decode_position(data: &[u8]) -> Result<PositionData> {
    if data.len() < READ_POSITION_MIN_LEN {
        return Err(RustLtfsError::format(format!(
            "read position: response too short ({} bytes)",
            data.len()
        )));
    }

    let be_u64 = |at: usize| {
        let mut word = [0u8; 8];
        word.copy_from_slice(&data[at..at + 8]);
        u64::from_be_bytes(word)
    };
    let partition = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);

    if data[0] & READ_POSITION_BOP != 0 {
        return Ok(PositionData {
            partition,
            ..PositionData::default()
        });
    }

    Ok(PositionData {
        partition,
        block: be_u64(8),
        file: be_u64(16),
    })
}
