//! Tape operations on top of the st driver.
//!
//! ## Structure
//! - `mtio`: MTIOCTOP / MTIOCGET / MTIOCPOS requests and drive options
//! - `sequential`: bounded reads of filemark-terminated records
//! - `stream`: producer/consumer copy-out of data blocks
//! - `volume`: the VOL1 label

pub mod mtio;
pub mod sequential;
pub mod stream;
pub mod volume;

pub use mtio::{DriveOption, DriveOptions, MtOperation, MtRequest, MtStatus, TapeControl, TapeOps};
pub use stream::{copy_out, copy_out_with_progress, CancelToken, CopyEnd, CopyStats};
pub use volume::Vol1Label;
