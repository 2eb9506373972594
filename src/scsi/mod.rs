//! SCSI transport for sequential-access tape drives.
//!
//! ## Structure
//! - `constants`: operation codes, pages, SG_IO values
//! - `types`: CommandBlock and decoded responses
//! - `sense`: sense-data decoding
//! - `ffi`: the kernel `sg_io_hdr`
//! - `core`: the passthrough primitive and ScsiInterface
//! - `device`: the Linux tape node handle
//! - `commands`: the commands this crate needs on top of `core`

pub mod constants;
pub mod types;
pub mod ffi;
pub mod sense;
mod core;
mod device;
mod commands;

pub use self::core::{Passthrough, PassthroughOutcome, ScsiInterface};
pub use commands::io::BlockSource;
pub use commands::positioning::decode_position;
pub use constants::*;
pub use device::Drive;
pub use sense::SenseData;
pub use types::{CommandBlock, DataDirection, PositionData, TapeCapacity, Timeouts};
