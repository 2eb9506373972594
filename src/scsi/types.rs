use serde::{Deserialize, Serialize};

use super::constants::*;

/// Data transfer direction of a passthrough request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataDirection {
    None,
    FromDevice,
    ToDevice,
}

impl DataDirection {
    /// `sg_io_hdr.dxfer_direction` value
    pub fn sg_value(self) -> i32 {
        match self {
            DataDirection::None => SG_DXFER_NONE,
            DataDirection::ToDevice => SG_DXFER_TO_DEV,
            DataDirection::FromDevice => SG_DXFER_FROM_DEV,
        }
    }
}

/// Per-class command timeouts applied by [`ScsiInterface`](super::ScsiInterface)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub control_ms: u32,
    pub locate_ms: u32,
    pub read_ms: u32,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            control_ms: timeouts::CONTROL_MS,
            locate_ms: timeouts::LOCATE_MS,
            read_ms: timeouts::READ_MS,
        }
    }
}

/// A CDB together with its expected transfer length and timeout.
///
/// Built fresh for every call and consumed by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBlock {
    cdb: Vec<u8>,
    transfer_len: u32,
    timeout_ms: u32,
}

impl CommandBlock {
    pub fn new(cdb: Vec<u8>, transfer_len: u32, timeout_ms: u32) -> Self {
        assert!(!cdb.is_empty(), "CDB must contain at least the operation code");
        Self {
            cdb,
            transfer_len,
            timeout_ms,
        }
    }

    pub fn cdb(&self) -> &[u8] {
        &self.cdb
    }

    pub fn opcode(&self) -> u8 {
        self.cdb[0]
    }

    pub fn transfer_len(&self) -> u32 {
        self.transfer_len
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    pub fn with_timeout(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// Tape position as reported by READ POSITION
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PositionData {
    pub partition: u32,
    pub block: u64,
    pub file: u64,
}

/// Capacity log page values, in MiB
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TapeCapacity {
    pub remaining: [u32; 2],
    pub maximum: [u32; 2],
}
