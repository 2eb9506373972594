//! Streaming copy-out of tape blocks to a sink.
//!
//! One reader thread pulls blocks from the drive and hands them over a
//! rendezvous channel; the calling thread writes them out. At most one block
//! is in flight, and a write failure stops the reader before its next read.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam::channel;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Result, RustLtfsError};
use crate::scsi::sense::sense_key;
use crate::scsi::BlockSource;

/// Shared stop flag checked by the reader before every device read
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why a copy-out finished without error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CopyEnd {
    /// Drive reported a filemark
    Filemark,
    /// Drive reported BLANK CHECK (end of recorded data)
    BlankCheck,
    /// A read returned no data
    EmptyBlock,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CopyStats {
    pub buffers: u64,
    pub bytes: u64,
    pub end: CopyEnd,
}

/// Copy blocks from `source` into `sink` until the drive signals the end of
/// the file or data.
pub fn copy_out<S, W>(source: &mut S, sink: &mut W, token: &CancelToken) -> Result<CopyStats>
where
    S: BlockSource + Send,
    W: Write,
{
    copy_out_with_progress(source, sink, token, |_, _| {})
}

/// [`copy_out`] calling `progress(buffers, bytes)` after every block written
pub fn copy_out_with_progress<S, W, F>(
    source: &mut S,
    sink: &mut W,
    token: &CancelToken,
    mut progress: F,
) -> Result<CopyStats>
where
    S: BlockSource + Send,
    W: Write,
    F: FnMut(u64, u64),
{
    thread::scope(|scope| {
        let (tx, rx) = channel::bounded::<Vec<u8>>(0);

        let reader = scope.spawn(move || -> Result<CopyEnd> {
            loop {
                if token.is_cancelled() {
                    return Ok(CopyEnd::Cancelled);
                }
                let block = match source.read_block() {
                    Ok(block) => block,
                    Err(err) => return end_of_stream(err),
                };
                if block.is_empty() {
                    return Ok(CopyEnd::EmptyBlock);
                }
                if tx.send(block).is_err() {
                    return Ok(CopyEnd::Cancelled);
                }
            }
        });

        let mut buffers = 0u64;
        let mut bytes = 0u64;
        let mut write_error = None;
        for block in rx.iter() {
            if let Err(err) = sink.write_all(&block) {
                write_error = Some(err);
                break;
            }
            buffers += 1;
            bytes += block.len() as u64;
            progress(buffers, bytes);
        }

        if let Some(source) = write_error {
            token.cancel();
            drop(rx);
            // The reader's own result is moot once the sink has failed
            let _ = reader.join();
            warn!(
                "copy-out stopped after {} buffers ({} bytes): {}",
                buffers, bytes, source
            );
            return Err(RustLtfsError::CopyInterrupted {
                buffers,
                bytes,
                source,
            });
        }

        let end = reader
            .join()
            .map_err(|_| RustLtfsError::tape_device("copy-out reader thread panicked"))??;
        sink.flush()?;
        info!(
            "copy-out finished: {} buffers, {} bytes ({:?})",
            buffers, bytes, end
        );
        Ok(CopyStats {
            buffers,
            bytes,
            end,
        })
    })
}

/// Map a read error to a normal end of stream where the drive says so
fn end_of_stream(err: RustLtfsError) -> Result<CopyEnd> {
    match err.sense() {
        Some(sense) if sense.filemark() => {
            debug!("copy-out reached a filemark");
            Ok(CopyEnd::Filemark)
        }
        Some(sense) if sense.sense_key() == sense_key::BLANK_CHECK => {
            debug!("copy-out reached end of data");
            Ok(CopyEnd::BlankCheck)
        }
        _ => Err(err),
    }
}
