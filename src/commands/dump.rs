//! Dump Command Handler
//!
//! Handles the `dump` subcommand: locate to a block and stream everything up
//! to the next filemark (or end of data) into a local file.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::config::ReaderConfig;
use crate::error::Result;
use crate::scsi::{BlockSource, ScsiInterface, LOCATE16_FLAG_WITH_PART};
use crate::tape_ops::{copy_out_with_progress, CancelToken, CopyEnd, CopyStats};
use crate::utils::{format_bytes, format_speed};

pub async fn execute(
    device: String,
    partition: u8,
    block: u64,
    output: PathBuf,
    quiet: bool,
    config: ReaderConfig,
) -> Result<()> {
    info!(
        "Dumping {} partition {} block {} -> {:?}",
        device, partition, block, output
    );

    let token = CancelToken::new();
    let interrupt = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping after the current block");
                token.cancel();
            }
        })
    };

    let started = Instant::now();
    let target = output.clone();
    let result = super::blocking(move || {
        let drive = super::open_drive(&device, &config)?;
        let mut scsi = ScsiInterface::new(&drive).with_timeouts(config.timeouts);
        scsi.locate16(LOCATE16_FLAG_WITH_PART, partition, block)?;
        copy_to_file(&mut scsi, &target, &token, spinner(quiet)?)
    })
    .await;
    interrupt.abort();

    let stats = result?;
    let elapsed = started.elapsed().as_secs_f64();
    println!(
        "Copied {} in {} blocks to {} ({}, {})",
        format_bytes(stats.bytes),
        stats.buffers,
        output.display(),
        end_description(stats.end),
        format_speed(stats.bytes, elapsed)
    );
    Ok(())
}

fn spinner(quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let style = ProgressStyle::with_template("{spinner} {msg} [{elapsed_precise}]")
        .context("invalid progress template")?;
    let bar = ProgressBar::new_spinner().with_style(style);
    bar.enable_steady_tick(Duration::from_millis(120));
    Ok(bar)
}

/// Stream `source` into a new file at `path`
fn copy_to_file<S>(
    source: &mut S,
    path: &Path,
    token: &CancelToken,
    progress: ProgressBar,
) -> Result<CopyStats>
where
    S: BlockSource + Send,
{
    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let mut sink = BufWriter::new(file);

    let copied = copy_out_with_progress(source, &mut sink, token, |buffers, bytes| {
        progress.set_message(format!("{} in {} blocks", format_bytes(bytes), buffers));
    });
    progress.finish_and_clear();

    let stats = copied?;
    info!(
        "Copy finished: {} blocks, {} bytes, {:?}",
        stats.buffers, stats.bytes, stats.end
    );
    Ok(stats)
}

fn end_description(end: CopyEnd) -> &'static str {
    match end {
        CopyEnd::Filemark => "stopped at filemark",
        CopyEnd::BlankCheck => "stopped at end of data",
        CopyEnd::EmptyBlock => "stopped at empty block",
        CopyEnd::Cancelled => "cancelled",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Blocks(std::vec::IntoIter<Vec<u8>>);

    impl BlockSource for Blocks {
        fn read_block(&mut self) -> Result<Vec<u8>> {
            Ok(self.0.next().unwrap_or_default())
        }
    }

    #[test]
    fn test_copy_to_file_writes_blocks_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.bin");
        let mut source = Blocks(vec![vec![1u8; 10], vec![2u8; 5]].into_iter());

        let stats =
            copy_to_file(&mut source, &path, &CancelToken::new(), ProgressBar::hidden()).unwrap();
        assert_eq!(stats.buffers, 2);
        assert_eq!(stats.bytes, 15);
        assert_eq!(stats.end, CopyEnd::EmptyBlock);

        let written = std::fs::read(&path).unwrap();
        assert_eq!(&written[..10], &[1u8; 10]);
        assert_eq!(&written[10..], &[2u8; 5]);
    }

    #[test]
    fn test_copy_to_missing_directory_fails_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent").join("dump.bin");
        let mut source = Blocks(vec![vec![1u8; 10]].into_iter());

        assert!(copy_to_file(&mut source, &path, &CancelToken::new(), ProgressBar::hidden()).is_err());
        assert_eq!(source.0.len(), 1);
    }
}
