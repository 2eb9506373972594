//! SCSI Read Commands
//!
//! Bulk READ(6) in variable-block mode, and the block source that the
//! copy-out pipeline pulls from.

use crate::error::Result;
use tracing::trace;

use super::super::{
    constants::*,
    core::{Passthrough, ScsiInterface},
    types::CommandBlock,
};

impl CommandBlock {
    /// Variable-length READ(6) of up to `len` bytes with SILI set
    pub fn read6(len: u32) -> Self {
        let l = len.to_be_bytes();
        Self::new(
            vec![scsi_commands::READ_6, READ6_FLAG_SILI, l[1], l[2], l[3], 0],
            len,
            timeouts::READ_MS,
        )
    }
}

impl<P: Passthrough> ScsiInterface<P> {
    /// Read the next block (at most 256 KiB), trimmed to what the drive
    /// actually transferred
    pub fn read(&self) -> Result<Vec<u8>> {
        let data = self.execute_read(
            CommandBlock::read6(READ_BUFFER_LEN).with_timeout(self.timeouts.read_ms),
        )?;
        trace!("READ(6) returned {} bytes", data.len());
        Ok(data)
    }
}

/// Anything that hands out successive tape blocks
pub trait BlockSource {
    fn read_block(&mut self) -> Result<Vec<u8>>;
}

impl<P: Passthrough> BlockSource for ScsiInterface<P> {
    fn read_block(&mut self) -> Result<Vec<u8>> {
        self.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scsi::PassthroughOutcome;
    use crate::testing::ScriptedPassthrough;

    #[test]
    fn test_read6_cdb_encodes_transfer_length() {
        let cmd = CommandBlock::read6(READ_BUFFER_LEN);
        assert_eq!(cmd.cdb(), &[0x08, 0x02, 0x04, 0x00, 0x00, 0]);
        assert_eq!(cmd.transfer_len(), 256 * 1024);
        assert_eq!(cmd.timeout_ms(), timeouts::READ_MS);
    }

    #[test]
    fn test_read_returns_transferred_bytes_only() {
        let device = ScriptedPassthrough::new();
        let mut block = vec![0x5Au8; 4096];
        block.resize(READ_BUFFER_LEN as usize, 0);
        device.push_reply(
            block,
            PassthroughOutcome {
                resid: (READ_BUFFER_LEN - 4096) as i32,
                ..PassthroughOutcome::ok()
            },
        );
        let mut scsi = ScsiInterface::new(&device);

        let data = scsi.read_block().unwrap();
        assert_eq!(data.len(), 4096);
        assert!(data.iter().all(|&b| b == 0x5A));
    }
}
