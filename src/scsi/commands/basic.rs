//! SCSI Basic Commands
//!
//! This module contains basic SCSI commands like TEST UNIT READY, MODE SENSE
//! and LOG SENSE.

use crate::error::{Result, RustLtfsError};
use tracing::debug;

use super::super::{
    constants::*,
    core::{Passthrough, ScsiInterface},
    types::{CommandBlock, TapeCapacity},
};

/// Offset of "additional partitions defined" in a MODE SENSE(6) response
/// carrying one block descriptor and the medium partition page
const ADDITIONAL_PARTITIONS_OFFSET: usize = 0x0f;

impl CommandBlock {
    pub fn test_unit_ready() -> Self {
        Self::new(
            vec![scsi_commands::TEST_UNIT_READY, 0, 0, 0, 0, 0],
            0,
            timeouts::CONTROL_MS,
        )
    }

    pub fn mode_sense6(page_code: u8, alloc_len: u8) -> Self {
        Self::new(
            vec![scsi_commands::MODE_SENSE_6, 0, page_code, 0, alloc_len, 0],
            alloc_len as u32,
            timeouts::CONTROL_MS,
        )
    }

    /// LOG SENSE of the cumulative values of `page_code`
    pub fn log_sense(page_code: u8, alloc_len: u16) -> Self {
        let len = alloc_len.to_be_bytes();
        Self::new(
            vec![
                scsi_commands::LOG_SENSE,
                0,
                0b0100_0000 | page_code,
                0,
                0,
                0,
                0, // parameter pointer
                len[0],
                len[1],
                0,
            ],
            alloc_len as u32,
            timeouts::CONTROL_MS,
        )
    }
}

impl<P: Passthrough> ScsiInterface<P> {
    /// Test Unit Ready command - check if device is ready
    pub fn test_unit_ready(&self) -> Result<()> {
        debug!("Executing Test Unit Ready command");
        self.execute(CommandBlock::test_unit_ready().with_timeout(self.timeouts.control_ms))
    }

    pub fn mode_sense6(&self, page_code: u8, alloc_len: u8) -> Result<Vec<u8>> {
        debug!("MODE SENSE(6): page=0x{:02X} alloc={}", page_code, alloc_len);
        self.execute_read(
            CommandBlock::mode_sense6(page_code, alloc_len).with_timeout(self.timeouts.control_ms),
        )
    }

    /// Require a medium formatted with exactly two partitions
    pub fn check_partitions(&self) -> Result<()> {
        let data = self.mode_sense6(mode_pages::MEDIUM_PARTITIONS, 0xff)?;
        if data.len() <= ADDITIONAL_PARTITIONS_OFFSET {
            return Err(RustLtfsError::precondition(format!(
                "check partitions: short read ({} bytes)",
                data.len()
            )));
        }
        let additional = data[ADDITIONAL_PARTITIONS_OFFSET];
        if additional != 1 {
            return Err(RustLtfsError::precondition(format!(
                "check partitions: expected 2 partitions, got {}",
                additional as u32 + 1
            )));
        }
        debug!("Medium has two partitions");
        Ok(())
    }

    pub fn log_sense(&self, page_code: u8, alloc_len: u16) -> Result<Vec<u8>> {
        debug!(
            "Executing LOG SENSE command: page_code=0x{:02X}, alloc={}",
            page_code, alloc_len
        );
        self.execute_read(
            CommandBlock::log_sense(page_code, alloc_len).with_timeout(self.timeouts.control_ms),
        )
    }

    /// Remaining and maximum capacity of both partitions
    pub fn tape_capacity(&self) -> Result<TapeCapacity> {
        let page = self.log_sense(log_pages::TAPE_CAPACITY, 0x80)?;
        parse_tape_capacity(&page)
    }
}

/// Decode the tape capacity log page (parameter codes 1..=4)
pub fn parse_tape_capacity(page: &[u8]) -> Result<TapeCapacity> {
    if page.len() < 4 || page[0] & 0x3f != log_pages::TAPE_CAPACITY {
        return Err(RustLtfsError::format("not a tape capacity log page"));
    }
    let page_len = u16::from_be_bytes([page[2], page[3]]) as usize;
    let end = (4 + page_len).min(page.len());

    let mut capacity = TapeCapacity::default();
    let mut offset = 4;
    while offset + 4 <= end {
        let code = u16::from_be_bytes([page[offset], page[offset + 1]]);
        let len = page[offset + 3] as usize;
        let value_at = offset + 4;
        if value_at + len > end {
            break;
        }
        if len == 4 {
            let value = u32::from_be_bytes([
                page[value_at],
                page[value_at + 1],
                page[value_at + 2],
                page[value_at + 3],
            ]);
            match code {
                1 => capacity.remaining[0] = value,
                2 => capacity.remaining[1] = value,
                3 => capacity.maximum[0] = value,
                4 => capacity.maximum[1] = value,
                _ => {}
            }
        }
        offset = value_at + len;
    }
    Ok(capacity)
}
