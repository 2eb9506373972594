//! Opening an LTFS volume from the index partition.
//!
//! The head of partition 0 holds VOL1, the LTFS label and the first index.
//! Every later write session appends another index, so the whole partition
//! is scanned forward and the highest generation wins.

use std::io::{self, Read};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::RustLtfsError;
use crate::ltfs_index::{contains_index_marker, IndexWarning, LtfsIndex, LtfsLabel};
use crate::scsi::{Passthrough, PositionData, ScsiInterface};
use crate::tape_ops::mtio::{TapeControl, TapeOps};
use crate::tape_ops::sequential::{
    read_full, read_required_record, read_short_record, ReadEnd, ShortRead,
};
use crate::tape_ops::volume::Vol1Label;

/// Buffer for the second attempt at an index larger than a short file
pub const INDEX_RETRY_LIMIT: usize = 16 << 20;

/// Partition LTFS keeps its indexes on
const INDEX_PARTITION: i32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOptions {
    /// Issue READ POSITION before every index record
    pub capture_positions: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            capture_positions: true,
        }
    }
}

/// One index found on tape and where it started
#[derive(Debug, Clone, Serialize)]
pub struct Generation {
    pub position: Option<PositionData>,
    pub index: LtfsIndex,
}

#[derive(Debug, Clone)]
pub struct Volume {
    pub vol1_label: Vol1Label,
    pub label: LtfsLabel,
    /// Every index in scan order; the head index comes first
    pub generations: Vec<Generation>,
    latest: usize,
    /// Consistency warnings for the latest index
    pub warnings: Vec<IndexWarning>,
}

impl Volume {
    fn new(vol1_label: Vol1Label, label: LtfsLabel, head: Generation) -> Self {
        Self {
            vol1_label,
            label,
            generations: vec![head],
            latest: 0,
            warnings: Vec::new(),
        }
    }

    /// The authoritative index: highest generation number, first seen on ties
    pub fn latest_index(&self) -> &LtfsIndex {
        &self.generations[self.latest].index
    }

    pub fn latest_generation(&self) -> &Generation {
        &self.generations[self.latest]
    }

    fn push_generation(&mut self, generation: Generation) {
        let number = generation.index.generation_number;
        debug!(
            "Found index generation {} at {:?}",
            number, generation.position
        );
        self.generations.push(generation);
        if number > self.latest_index().generation_number {
            self.latest = self.generations.len() - 1;
        }
    }

    fn validate(&mut self) {
        let mut warnings = self.latest_index().validate();
        if let Some(mismatch) = self.latest_index().check_volume_uuid(&self.label) {
            warn!("{}", mismatch);
            warnings.push(mismatch);
        }
        self.warnings = warnings;
    }
}

/// Why a volume could not be (fully) opened
#[derive(Debug, Error)]
pub enum OpenError {
    /// Drive unreachable, I/O failure or sense error before any index was read
    #[error("device error: {0}")]
    Device(#[source] RustLtfsError),

    /// The head of the partition is not VOL1 / LTFS label / LTFS index
    #[error("not an LTFS volume: {0}")]
    NotLtfs(#[source] RustLtfsError),

    /// Scanning for later generations failed; the volume holds what was found
    #[error("index scan stopped after {} generation(s): {source}", volume.generations.len())]
    Partial {
        volume: Box<Volume>,
        #[source]
        source: RustLtfsError,
    },
}

impl OpenError {
    fn from_head(err: RustLtfsError) -> Self {
        if err.is_device_error() {
            OpenError::Device(err)
        } else {
            OpenError::NotLtfs(err)
        }
    }

    /// Volume recovered despite the error, if any
    pub fn volume(&self) -> Option<&Volume> {
        match self {
            OpenError::Partial { volume, .. } => Some(volume),
            _ => None,
        }
    }

    pub fn into_volume(self) -> Option<Volume> {
        match self {
            OpenError::Partial { volume, .. } => Some(*volume),
            _ => None,
        }
    }

    pub fn error(&self) -> &RustLtfsError {
        match self {
            OpenError::Device(err) | OpenError::NotLtfs(err) => err,
            OpenError::Partial { source, .. } => source,
        }
    }
}

/// Read the volume metadata from the index partition.
///
/// Leaves the tape somewhere on partition 0; the returned [`Volume`] holds
/// no reference to the device.
pub fn open<D>(device: &mut D, options: &OpenOptions) -> Result<Volume, OpenError>
where
    D: Passthrough + TapeControl + Read,
{
    info!("Opening LTFS volume");
    let mut volume = read_head(device, options).map_err(OpenError::from_head)?;
    info!(
        "VOL1 {} label version {}, head index generation {}",
        volume.vol1_label.vol_id(),
        volume.label.version,
        volume.latest_index().generation_number
    );

    let scanned = scan_generations(device, options, &mut volume);
    volume.validate();
    match scanned {
        Ok(()) => {
            info!(
                "Volume open: {} generation(s), latest {}",
                volume.generations.len(),
                volume.latest_index().generation_number
            );
            Ok(volume)
        }
        Err(source) => {
            warn!("Index scan stopped: {}", source);
            Err(OpenError::Partial {
                volume: Box::new(volume),
                source,
            })
        }
    }
}

fn capture_position<D>(device: &D, options: &OpenOptions) -> crate::Result<Option<PositionData>>
where
    D: Passthrough,
{
    if !options.capture_positions {
        return Ok(None);
    }
    ScsiInterface::new(device).read_position().map(Some)
}

/// VOL1, label and the first index
fn read_head<D>(device: &mut D, options: &OpenOptions) -> crate::Result<Volume>
where
    D: Passthrough + TapeControl + Read,
{
    device.seek(0)?;
    device.set_partition(INDEX_PARTITION)?;

    let vol1 = read_required_record(device)?;
    let vol1_label = Vol1Label::parse(&vol1)?;
    debug!("VOL1 label: {}", vol1_label.vol_id());

    let label = LtfsLabel::from_bytes(&read_required_record(device)?)?;

    let mut position = capture_position(device, options)?;
    let mut record = read_required_record(device)?;
    if record.is_empty() {
        debug!("Skipping separator before the head index");
        position = capture_position(device, options)?;
        record = read_required_record(device)?;
        if record.is_empty() {
            return Err(RustLtfsError::protocol(
                "two empty records where the head index belongs",
            ));
        }
    }
    let index = LtfsIndex::from_bytes(&record)?;

    Ok(Volume::new(vol1_label, label, Generation { position, index }))
}

/// Forward scan for the indexes written after the head one
fn scan_generations<D>(device: &mut D, options: &OpenOptions, volume: &mut Volume) -> crate::Result<()>
where
    D: Passthrough + TapeControl + Read,
{
    let mut empty_records = 0;
    loop {
        let position = capture_position(device, options)?;
        let record = read_short_record(device)?;

        if record.data.is_empty() && record.ended_at_filemark() {
            empty_records += 1;
            if empty_records >= 2 {
                debug!("Two empty records: end of index partition");
                return Ok(());
            }
            continue;
        }
        empty_records = 0;

        let ShortRead { data, end } = record;
        if !contains_index_marker(&data) {
            if let ReadEnd::Failed(err) = end {
                return end_of_data_or_error(device, err);
            }
            debug!(
                "Record without index marker ({} bytes): scan complete",
                data.len()
            );
            return Ok(());
        }

        let data = match end {
            ReadEnd::EndOfFile => data,
            end => {
                warn!(
                    "Index record did not end within {} bytes ({:?}), retrying with {} bytes",
                    data.len(),
                    end,
                    INDEX_RETRY_LIMIT
                );
                // read_short_record already backed up to the start of this record
                let mut buf = vec![0u8; INDEX_RETRY_LIMIT];
                let outcome = read_full(device, &mut buf);
                device.bsfm(1)?;
                match outcome.end {
                    ReadEnd::EndOfFile => {
                        buf.truncate(outcome.filled);
                        buf
                    }
                    ReadEnd::BufferFull => {
                        return Err(RustLtfsError::IndexTooBig {
                            limit: INDEX_RETRY_LIMIT,
                        })
                    }
                    ReadEnd::Failed(err) => return Err(RustLtfsError::Io(err)),
                }
            }
        };

        let index = LtfsIndex::from_bytes(&data)?;
        volume.push_generation(Generation { position, index });
    }
}

/// A failed read past the last index is normal only if the drive is at EOD
fn end_of_data_or_error<D>(device: &D, err: io::Error) -> crate::Result<()>
where
    D: TapeControl,
{
    match device.tape_status() {
        Ok(status) if status.at_eod() => {
            debug!("Read failed at end of data ({}): scan complete", err);
            Ok(())
        }
        _ => Err(RustLtfsError::Io(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ltfs_index::parser::tests::{index_xml, LABEL_XML};
    use crate::tape_ops::mtio::MtOperation;
    use crate::testing::MockTape;

    fn head_records() -> Vec<Vec<u8>> {
        vec![
            Vol1Label::new("TAPE01", b'L', "LTFS", "").to_bytes().to_vec(),
            LABEL_XML.as_bytes().to_vec(),
            Vec::new(),
        ]
    }

    /// Head plus indexes in the given order, each preceded by a separator
    fn tape_with_generations(generations: &[u64]) -> Vec<Vec<u8>> {
        let mut records = head_records();
        for (i, g) in generations.iter().enumerate() {
            if i > 0 {
                records.push(Vec::new());
            }
            records.push(index_xml(*g).into_bytes());
        }
        records
    }

    #[test]
    fn test_latest_is_highest_generation_in_scan_order() {
        let mut tape = MockTape::new(tape_with_generations(&[5, 2, 9, 4]));
        let volume = open(&mut tape, &OpenOptions::default()).unwrap();

        let numbers: Vec<u64> = volume
            .generations
            .iter()
            .map(|g| g.index.generation_number)
            .collect();
        assert_eq!(numbers, vec![5, 2, 9, 4]);
        assert_eq!(volume.latest_index().generation_number, 9);
        assert_eq!(volume.vol1_label.vol_id(), "TAPE01");
        assert_eq!(volume.label.blocksize, 524288);
        assert!(volume.warnings.is_empty());
    }

    #[test]
    fn test_ties_keep_first_seen() {
        let mut records = head_records();
        records.push(index_xml(3).into_bytes());
        records.push(Vec::new());
        records.push(index_xml(3).replace("IBM LTFS", "other").into_bytes());
        let mut tape = MockTape::new(records);

        let volume = open(&mut tape, &OpenOptions::default()).unwrap();
        assert_eq!(volume.generations.len(), 2);
        assert!(volume.latest_index().creator.starts_with("IBM LTFS"));
    }

    #[test]
    fn test_positions_are_captured_per_index() {
        let mut tape = MockTape::new(tape_with_generations(&[1, 2]));
        let volume = open(&mut tape, &OpenOptions::default()).unwrap();
        let blocks: Vec<u64> = volume
            .generations
            .iter()
            .map(|g| g.position.unwrap().block)
            .collect();
        // head index is record 3, the next one follows the separator at 4
        assert_eq!(blocks, vec![3, 5]);

        let mut tape = MockTape::new(tape_with_generations(&[1]));
        let options = OpenOptions {
            capture_positions: false,
        };
        let volume = open(&mut tape, &options).unwrap();
        assert!(volume.generations[0].position.is_none());
    }

    #[test]
    fn test_head_without_separator() {
        let mut records = head_records();
        records.pop();
        records.push(index_xml(8).into_bytes());
        let mut tape = MockTape::new(records);
        let volume = open(&mut tape, &OpenOptions::default()).unwrap();
        assert_eq!(volume.latest_index().generation_number, 8);
    }

    #[test]
    fn test_seek_and_partition_switch_come_first() {
        let mut tape = MockTape::new(tape_with_generations(&[1]));
        open(&mut tape, &OpenOptions::default()).unwrap();
        let ops = tape.ops();
        assert_eq!(ops[0], (MtOperation::Seek, 0));
        assert_eq!(ops[1], (MtOperation::SetPartition, 0));
        assert!(ops[2..].iter().all(|op| *op == (MtOperation::Bsfm, 1)));
    }

    #[test]
    fn test_non_index_record_ends_scan() {
        let mut records = tape_with_generations(&[1, 2]);
        records.push(Vec::new());
        records.push(b"file data".to_vec());
        records.push(index_xml(99).into_bytes());
        let mut tape = MockTape::new(records);

        let volume = open(&mut tape, &OpenOptions::default()).unwrap();
        assert_eq!(volume.generations.len(), 2);
        assert_eq!(volume.latest_index().generation_number, 2);
    }

    #[test]
    fn test_large_index_is_read_with_retry_buffer() {
        let mut records = tape_with_generations(&[1]);
        let mut big = index_xml(6);
        big.push_str(&" ".repeat(2 << 20));
        records.push(Vec::new());
        records.push(big.into_bytes());
        let mut tape = MockTape::new(records);

        let volume = open(&mut tape, &OpenOptions::default()).unwrap();
        assert_eq!(volume.generations.len(), 2);
        assert_eq!(volume.latest_index().generation_number, 6);
    }

    #[test]
    fn test_index_too_big_keeps_earlier_generations() {
        let mut records = tape_with_generations(&[1]);
        let mut huge = b"<ltfsindex".to_vec();
        huge.resize(INDEX_RETRY_LIMIT + 1, b' ');
        records.push(Vec::new());
        records.push(huge);
        let huge_at = records.len() - 1;
        let mut tape = MockTape::new(records);

        let err = open(&mut tape, &OpenOptions::default()).unwrap_err();
        assert!(matches!(
            err.error(),
            RustLtfsError::IndexTooBig { limit: INDEX_RETRY_LIMIT }
        ));
        assert_eq!(err.volume().map(|v| v.generations.len()), Some(1));
        // repositioned to the start of the oversized record
        assert_eq!(tape.current_record(), huge_at);
        assert_eq!(tape.ops().last(), Some(&(MtOperation::Bsfm, 1)));
    }

    #[test]
    fn test_read_error_mid_scan_is_partial() {
        // records: vol1, label, sep, gen 1, sep, gen 2, sep, gen 9
        let mut tape = MockTape::new(tape_with_generations(&[1, 2, 9])).with_read_error_at(5);

        match open(&mut tape, &OpenOptions::default()) {
            Err(OpenError::Partial { volume, source }) => {
                assert!(matches!(source, RustLtfsError::Io(_)));
                assert_eq!(volume.generations.len(), 1);
                assert_eq!(volume.latest_index().generation_number, 1);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_read_error_at_end_of_data_ends_scan() {
        let records = tape_with_generations(&[1, 2]);
        let eod = records.len();
        let mut tape = MockTape::new(records).with_read_error_at(eod);

        let volume = open(&mut tape, &OpenOptions::default()).unwrap();
        assert_eq!(volume.generations.len(), 2);
        assert_eq!(volume.latest_index().generation_number, 2);
    }

    #[test]
    fn test_failed_retry_read_is_a_device_error() {
        let mut records = tape_with_generations(&[1]);
        let mut big = index_xml(6);
        big.push_str(&" ".repeat(2 << 20));
        records.push(Vec::new());
        records.push(big.into_bytes());
        let big_at = records.len() - 1;
        let mut tape = MockTape::new(records).with_read_error_after(big_at, 3 << 19);

        let err = open(&mut tape, &OpenOptions::default()).unwrap_err();
        assert!(matches!(err.error(), RustLtfsError::Io(_)));
        assert_eq!(err.volume().map(|v| v.generations.len()), Some(1));
        assert_eq!(tape.current_record(), big_at);
        assert_eq!(tape.ops().last(), Some(&(MtOperation::Bsfm, 1)));
    }

    #[test]
    fn test_empty_record_where_head_index_belongs() {
        let mut records = head_records();
        records.push(Vec::new());
        records.push(index_xml(1).into_bytes());
        let mut tape = MockTape::new(records);

        assert!(matches!(
            open(&mut tape, &OpenOptions::default()),
            Err(OpenError::NotLtfs(RustLtfsError::Protocol(_)))
        ));
    }

    #[test]
    fn test_scan_parse_error_is_partial() {
        let mut records = tape_with_generations(&[4]);
        records.push(Vec::new());
        records.push(b"<?xml version=\"1.0\"?><ltfsindex version=\"2.4.0\"><creator>".to_vec());
        let mut tape = MockTape::new(records);

        match open(&mut tape, &OpenOptions::default()) {
            Err(OpenError::Partial { volume, source }) => {
                assert!(matches!(source, RustLtfsError::Parse(_)));
                assert_eq!(volume.latest_index().generation_number, 4);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_head_errors_are_classified() {
        let mut tape = MockTape::new(tape_with_generations(&[1])).with_read_error_at(0);
        assert!(matches!(
            open(&mut tape, &OpenOptions::default()),
            Err(OpenError::Device(RustLtfsError::Io(_)))
        ));

        let mut records = tape_with_generations(&[1]);
        records[0] = b"HDR1".iter().copied().chain(std::iter::repeat(b' ').take(76)).collect();
        let mut tape = MockTape::new(records);
        assert!(matches!(
            open(&mut tape, &OpenOptions::default()),
            Err(OpenError::NotLtfs(RustLtfsError::Format(_)))
        ));

        let mut records = tape_with_generations(&[1]);
        records[1] = b"<notalabel/>".to_vec();
        let mut tape = MockTape::new(records);
        assert!(matches!(
            open(&mut tape, &OpenOptions::default()),
            Err(OpenError::NotLtfs(_))
        ));
    }

    #[test]
    fn test_uuid_mismatch_is_a_warning() {
        let mut records = tape_with_generations(&[1]);
        records[3] = index_xml(1)
            .replace(
                "6a8f4c1e-2b3d-4e5f-8a9b-0c1d2e3f4a5b",
                "11111111-2222-4333-8444-555555555555",
            )
            .into_bytes();
        let mut tape = MockTape::new(records);
        let volume = open(&mut tape, &OpenOptions::default()).unwrap();
        assert!(matches!(
            volume.warnings.as_slice(),
            [IndexWarning::VolumeUuidMismatch { .. }]
        ));
    }
}
