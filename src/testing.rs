//! In-memory devices for unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Read};

use crate::scsi::{
    scsi_commands, CommandBlock, DataDirection, Passthrough, PassthroughOutcome,
};
use crate::tape_ops::mtio::{MtOperation, MtRequest, MtStatus, TapeControl, GMT_EOD};

/// One request seen by [`ScriptedPassthrough`]
#[derive(Debug, Clone)]
pub struct Issued {
    pub cdb: Vec<u8>,
    pub direction: DataDirection,
    pub transfer_len: u32,
    pub timeout_ms: u32,
    /// Data handed to the device for host-to-device transfers
    pub payload: Vec<u8>,
}

/// Answers passthrough requests from a queue of canned replies
#[derive(Default)]
pub struct ScriptedPassthrough {
    replies: RefCell<VecDeque<(Vec<u8>, PassthroughOutcome)>>,
    issued: RefCell<Vec<Issued>>,
}

impl ScriptedPassthrough {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply; `data` is copied into the receive buffer of a
    /// device-to-host transfer
    pub fn push_reply(&self, data: Vec<u8>, outcome: PassthroughOutcome) {
        self.replies.borrow_mut().push_back((data, outcome));
    }

    pub fn issued(&self) -> Vec<Issued> {
        self.issued.borrow().clone()
    }
}

impl Passthrough for ScriptedPassthrough {
    fn passthrough(
        &self,
        cmd: &CommandBlock,
        direction: DataDirection,
        data: &mut [u8],
    ) -> PassthroughOutcome {
        self.issued.borrow_mut().push(Issued {
            cdb: cmd.cdb().to_vec(),
            direction,
            transfer_len: cmd.transfer_len(),
            timeout_ms: cmd.timeout_ms(),
            payload: match direction {
                DataDirection::ToDevice => data.to_vec(),
                _ => Vec::new(),
            },
        });

        let Some((reply, outcome)) = self.replies.borrow_mut().pop_front() else {
            return PassthroughOutcome {
                os_error: Some(io::Error::from_raw_os_error(libc::EIO)),
                ..PassthroughOutcome::ok()
            };
        };
        if direction == DataDirection::FromDevice {
            let n = reply.len().min(data.len());
            data[..n].copy_from_slice(&reply[..n]);
        }
        outcome
    }
}

#[derive(Debug, Default)]
struct TapeState {
    partition: usize,
    record: usize,
    offset: usize,
    ops: Vec<(MtOperation, i32)>,
}

/// A tape of filemark-separated records on one or more partitions.
///
/// Reading a record returns its bytes, then one zero-length read as the
/// filemark is crossed. Past the last record every read returns zero.
pub struct MockTape {
    partitions: Vec<Vec<Vec<u8>>>,
    state: RefCell<TapeState>,
    /// Record index and byte offset from which reads fail
    read_error: Option<(usize, usize)>,
}

impl MockTape {
    pub fn new(records: Vec<Vec<u8>>) -> Self {
        Self::with_partitions(vec![records])
    }

    pub fn with_partitions(partitions: Vec<Vec<Vec<u8>>>) -> Self {
        Self {
            partitions,
            state: RefCell::new(TapeState::default()),
            read_error: None,
        }
    }

    /// Fail every read of record `index` with EIO
    pub fn with_read_error_at(mut self, index: usize) -> Self {
        self.read_error = Some((index, 0));
        self
    }

    /// Deliver the first `bytes` of record `index`, then fail with EIO
    pub fn with_read_error_after(mut self, index: usize, bytes: usize) -> Self {
        self.read_error = Some((index, bytes));
        self
    }

    pub fn ops(&self) -> Vec<(MtOperation, i32)> {
        self.state.borrow().ops.clone()
    }

    pub fn current_record(&self) -> usize {
        self.state.borrow().record
    }

    fn records(&self, partition: usize) -> &[Vec<u8>] {
        self.partitions
            .get(partition)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl Read for MockTape {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.borrow_mut();
        let mut limit = usize::MAX;
        if let Some((index, after)) = self.read_error {
            if index == state.record {
                if state.offset >= after {
                    return Err(io::Error::from_raw_os_error(libc::EIO));
                }
                limit = after - state.offset;
            }
        }
        let records = self.records(state.partition);
        let Some(record) = records.get(state.record) else {
            return Ok(0);
        };
        if state.offset < record.len() {
            let n = buf.len().min(record.len() - state.offset).min(limit);
            buf[..n].copy_from_slice(&record[state.offset..state.offset + n]);
            state.offset += n;
            return Ok(n);
        }
        state.record += 1;
        state.offset = 0;
        Ok(0)
    }
}

impl TapeControl for MockTape {
    fn tape_op(&self, request: MtRequest) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        state.ops.push((request.op, request.count));
        let count = request.count.max(0) as usize;
        match request.op {
            MtOperation::Bsfm => {
                state.record = state.record.saturating_sub(count.saturating_sub(1));
                state.offset = 0;
            }
            MtOperation::Fsf => {
                state.record += count;
                state.offset = 0;
            }
            MtOperation::Rewind => {
                state.record = 0;
                state.offset = 0;
            }
            MtOperation::Seek => {
                state.record = count;
                state.offset = 0;
            }
            MtOperation::SetPartition => {
                if count >= self.partitions.len() {
                    return Err(io::Error::from_raw_os_error(libc::EIO));
                }
                state.partition = count;
                state.record = 0;
                state.offset = 0;
            }
            _ => {}
        }
        Ok(())
    }

    fn tape_status(&self) -> io::Result<MtStatus> {
        let state = self.state.borrow();
        let gstat = if state.record >= self.records(state.partition).len() {
            GMT_EOD
        } else {
            0
        };
        Ok(MtStatus {
            gstat,
            file_number: state.record as i32,
            ..MtStatus::default()
        })
    }

    fn tape_position(&self) -> io::Result<i64> {
        Ok(self.state.borrow().record as i64)
    }
}

impl Passthrough for MockTape {
    /// Answers READ POSITION with the current partition and record; every
    /// other command succeeds without data
    fn passthrough(
        &self,
        cmd: &CommandBlock,
        direction: DataDirection,
        data: &mut [u8],
    ) -> PassthroughOutcome {
        if cmd.opcode() == scsi_commands::READ_POSITION && direction == DataDirection::FromDevice
        {
            let state = self.state.borrow();
            let mut reply = [0u8; 32];
            reply[4..8].copy_from_slice(&(state.partition as u32).to_be_bytes());
            reply[8..16].copy_from_slice(&(state.record as u64).to_be_bytes());
            reply[16..24].copy_from_slice(&(state.record as u64).to_be_bytes());
            let n = reply.len().min(data.len());
            data[..n].copy_from_slice(&reply[..n]);
            return PassthroughOutcome {
                resid: (data.len() - n) as i32,
                ..PassthroughOutcome::ok()
            };
        }
        PassthroughOutcome {
            resid: data.len() as i32,
            ..PassthroughOutcome::ok()
        }
    }
}
