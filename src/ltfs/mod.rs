//! LTFS volume access
//!
//! Opening a volume reads VOL1, the LTFS label and every index generation
//! from the index partition.

pub mod volume;

pub use volume::{open, Generation, OpenError, OpenOptions, Volume, INDEX_RETRY_LIMIT};
