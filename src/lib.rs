//! LTFS Reader Library
//!
//! Reads LTFS volumes straight from a Linux tape drive: SG_IO passthrough
//! for SCSI commands, MTIO for positioning, and the LTFS label and index
//! data model on top.

pub mod cli;
pub mod commands;
pub mod config;
pub mod display;
pub mod error;
pub mod logger;
pub mod ltfs;
pub mod ltfs_index;
pub mod scsi;
pub mod tape_ops;
pub mod utils;

#[cfg(test)]
mod testing;

// Re-export key types for easier use
pub use config::ReaderConfig;
pub use error::{Result, RustLtfsError};
pub use ltfs::{open, Generation, OpenError, OpenOptions, Volume};
pub use ltfs_index::{Directory, File, FileExtent, LtfsIndex, LtfsLabel};
pub use scsi::{Drive, Passthrough, PositionData, ScsiInterface, SenseData};
pub use tape_ops::{DriveOptions, MtStatus, TapeControl, TapeOps, Vol1Label};
