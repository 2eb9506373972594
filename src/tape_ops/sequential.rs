//! Bounded "read until filemark" helpers.
//!
//! A tape record of unknown length ends when the st driver returns a zero
//! length read at the filemark. Label and index records are read this way.

use std::io::{self, Read};

use tracing::{debug, trace};

use super::mtio::{TapeControl, TapeOps};
use crate::error::{Result, RustLtfsError};

/// Ceiling for label and index records
pub const SHORT_FILE_LIMIT: usize = 1 << 20;

/// How a [`read_full`] call stopped
#[derive(Debug)]
pub enum ReadEnd {
    /// Buffer exhausted before any end-of-file
    BufferFull,
    /// A read returned zero bytes (filemark)
    EndOfFile,
    Failed(io::Error),
}

impl ReadEnd {
    pub fn is_eof(&self) -> bool {
        matches!(self, ReadEnd::EndOfFile)
    }
}

#[derive(Debug)]
pub struct FillOutcome {
    pub filled: usize,
    pub end: ReadEnd,
}

/// Fill `buf` from `reader`, tolerating short reads.
pub fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> FillOutcome {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return FillOutcome {
                    filled,
                    end: ReadEnd::EndOfFile,
                }
            }
            Ok(n) => {
                trace!("read {} bytes", n);
                filled += n;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return FillOutcome {
                    filled,
                    end: ReadEnd::Failed(e),
                }
            }
        }
    }
    FillOutcome {
        filled,
        end: ReadEnd::BufferFull,
    }
}

/// Contents of one short file and how its read ended
#[derive(Debug)]
pub struct ShortRead {
    pub data: Vec<u8>,
    pub end: ReadEnd,
}

impl ShortRead {
    pub fn ended_at_filemark(&self) -> bool {
        self.end.is_eof()
    }

    /// The record contents, provided the read ended at a filemark
    pub fn into_data(self) -> Result<Vec<u8>> {
        match self.end {
            ReadEnd::EndOfFile => Ok(self.data),
            ReadEnd::BufferFull => Err(RustLtfsError::FileTooBig {
                limit: SHORT_FILE_LIMIT,
            }),
            ReadEnd::Failed(e) => Err(RustLtfsError::Io(e)),
        }
    }
}

/// Read one record of at most [`SHORT_FILE_LIMIT`] bytes.
pub fn read_short_file<R: Read + ?Sized>(reader: &mut R) -> ShortRead {
    let mut buf = vec![0u8; SHORT_FILE_LIMIT];
    let FillOutcome { filled, end } = read_full(reader, &mut buf);

    let data = if filled < SHORT_FILE_LIMIT / 2 {
        buf[..filled].to_vec()
    } else {
        buf.truncate(filled);
        buf
    };
    ShortRead { data, end }
}

/// [`read_short_file`] followed by a one-filemark backspace.
///
/// After a clean read this leaves the tape at the start of the next record;
/// after an aborted one it rewinds to the start of the record just tried.
pub fn read_short_record<D>(device: &mut D) -> Result<ShortRead>
where
    D: Read + TapeControl + ?Sized,
{
    let record = read_short_file(device);
    debug!(
        "short record: {} bytes, end={:?}",
        record.data.len(),
        record.end
    );
    device.bsfm(1)?;
    Ok(record)
}

/// A short record that must end at a filemark
pub fn read_required_record<D>(device: &mut D) -> Result<Vec<u8>>
where
    D: Read + TapeControl + ?Sized,
{
    read_short_record(device)?.into_data()
}
