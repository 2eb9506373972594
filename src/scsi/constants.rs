// SCSI constant definitions (SPC / SSC)

/// Sense buffer capacity handed to the kernel with every SG_IO request
pub const SENSE_BUFFER_LEN: usize = 32;

/// `SG_IO` ioctl request number (not `_IOC` encoded)
pub const SG_IO: u32 = 0x2285;
/// `sg_io_hdr.interface_id` marker
pub const SG_INTERFACE_ID: i32 = b'S' as i32;

// sg_io_hdr.dxfer_direction
pub const SG_DXFER_NONE: i32 = -1;
pub const SG_DXFER_TO_DEV: i32 = -2;
pub const SG_DXFER_FROM_DEV: i32 = -3;

// SCSI Commands Module
pub mod scsi_commands {
    pub const TEST_UNIT_READY: u8 = 0x00;
    pub const READ_6: u8 = 0x08;
    pub const MODE_SENSE_6: u8 = 0x1A;
    pub const LOCATE_10: u8 = 0x2B;
    pub const READ_POSITION: u8 = 0x34;
    pub const LOG_SENSE: u8 = 0x4D;
    pub const LOCATE_16: u8 = 0x92;
}

pub mod mode_pages {
    pub const MEDIUM_PARTITIONS: u8 = 0x11;
}

pub mod log_pages {
    pub const TAPE_CAPACITY: u8 = 0x31;
}

/// READ POSITION service action returning partition / object / file numbers
pub const READ_POSITION_LONG_FORM: u8 = 0x06;
/// Beginning-of-partition flag in byte 0 of the READ POSITION response
pub const READ_POSITION_BOP: u8 = 0x80;

/// LOCATE(10) byte 1: change partition
pub const LOCATE10_FLAG_WITH_PART: u8 = 0b0000_0010;

// LOCATE(16) byte 1
pub const LOCATE16_FLAG_DEST_OBJ_ID: u8 = 0b00_000_000;
pub const LOCATE16_FLAG_DEST_FILE_ID: u8 = 0b00_001_000;
pub const LOCATE16_FLAG_DEST_EOD: u8 = 0b00_011_000;
pub const LOCATE16_FLAG_WITH_PART: u8 = 0b00_000_010;

/// READ(6) byte 1: suppress incorrect length indicator
pub const READ6_FLAG_SILI: u8 = 0b0000_0010;

/// Transfer size of a single bulk READ
pub const READ_BUFFER_LEN: u32 = 256 * 1024;

pub mod timeouts {
    /// test unit ready, mode/log sense, read position
    pub const CONTROL_MS: u32 = 60_000;
    /// locate may have to wind the whole tape
    pub const LOCATE_MS: u32 = 600_000;
    pub const READ_MS: u32 = 600_000;
}
