//! Magnetic tape control through the st driver's MTIO ioctls.
//!
//! Requests and status blocks are encoded byte by byte in the native layout
//! the kernel expects (`struct mtop`, `struct mtget`, `struct mtpos`).

use std::io;
use std::os::fd::RawFd;

use serde::Serialize;
use tracing::debug;

use crate::error::{Result, RustLtfsError};

/// Size of `struct mtop`: `short mt_op`, padding, `int mt_count`
pub const MTOP_LEN: usize = 8;
/// Size of `struct mtget` on LP64: five `long` fields then two `int`s
pub const MTGET_LEN: usize = 48;

mod ioctl_func {
    use super::{MTGET_LEN, MTOP_LEN};

    nix::ioctl_write_ptr!(mtioctop, b'm', 1, [u8; MTOP_LEN]);
    nix::ioctl_read!(mtiocget, b'm', 2, [u8; MTGET_LEN]);
    nix::ioctl_read!(mtiocpos, b'm', 3, [u8; 8]);
}

/// `mt_op` codes from `<linux/mtio.h>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum MtOperation {
    Reset = 0,
    /// Forward space over filemark, positioned after it
    Fsf = 1,
    /// Backward space filemark, positioned before it
    Bsf = 2,
    Fsr = 3,
    Bsr = 4,
    Weof = 5,
    Rewind = 6,
    Offline = 7,
    Nop = 8,
    Retension = 9,
    /// Backward space filemark, positioned after it (start of the next file)
    Bsfm = 10,
    /// Forward space filemark, positioned before it
    Fsfm = 11,
    Eom = 12,
    Erase = 13,
    SetBlock = 20,
    SetDensity = 21,
    Seek = 22,
    Tell = 23,
    SetDriveBuffer = 24,
    Fss = 25,
    Bss = 26,
    Wsm = 27,
    Lock = 28,
    Unlock = 29,
    Load = 30,
    Unload = 31,
    Compression = 32,
    SetPartition = 33,
    MakePartition = 34,
    WeofImmediate = 35,
}

/// One "op + count" tape request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MtRequest {
    pub op: MtOperation,
    pub count: i32,
}

impl MtRequest {
    pub fn new(op: MtOperation, count: i32) -> Self {
        Self { op, count }
    }

    pub fn to_bytes(&self) -> [u8; MTOP_LEN] {
        let mut raw = [0u8; MTOP_LEN];
        raw[0..2].copy_from_slice(&(self.op as i16).to_ne_bytes());
        raw[4..8].copy_from_slice(&self.count.to_ne_bytes());
        raw
    }
}

// mt_gstat bits (GMT_*)
pub const GMT_EOF: i64 = 0x8000_0000;
pub const GMT_BOT: i64 = 0x4000_0000;
pub const GMT_EOT: i64 = 0x2000_0000;
pub const GMT_SM: i64 = 0x1000_0000;
pub const GMT_EOD: i64 = 0x0800_0000;
pub const GMT_WR_PROT: i64 = 0x0400_0000;
pub const GMT_ONLINE: i64 = 0x0100_0000;
pub const GMT_DR_OPEN: i64 = 0x0004_0000;
pub const GMT_IM_REP_EN: i64 = 0x0001_0000;
pub const GMT_CLN: i64 = 0x0000_8000;

const MT_ST_BLKSIZE_MASK: i64 = 0x00ff_ffff;
const MT_ST_DENSITY_SHIFT: u32 = 24;

/// Decoded `struct mtget`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MtStatus {
    pub mt_type: i64,
    /// Bytes, records or files not processed by the last operation
    pub resid: i64,
    pub dsreg: i64,
    pub gstat: i64,
    pub erreg: i64,
    pub file_number: i32,
    pub block_number: i32,
}

impl MtStatus {
    pub fn from_bytes(raw: &[u8; MTGET_LEN]) -> Self {
        let long = |at: usize| {
            let mut word = [0u8; 8];
            word.copy_from_slice(&raw[at..at + 8]);
            i64::from_ne_bytes(word)
        };
        let int = |at: usize| {
            let mut word = [0u8; 4];
            word.copy_from_slice(&raw[at..at + 4]);
            i32::from_ne_bytes(word)
        };

        Self {
            mt_type: long(0),
            resid: long(8),
            dsreg: long(16),
            gstat: long(24),
            erreg: long(32),
            file_number: int(40),
            block_number: int(44),
        }
    }

    /// Block size from the device register, 0 in variable mode
    pub fn block_size(&self) -> u32 {
        (self.dsreg & MT_ST_BLKSIZE_MASK) as u32
    }

    pub fn density(&self) -> u8 {
        ((self.dsreg >> MT_ST_DENSITY_SHIFT) & 0xff) as u8
    }

    pub fn at_bot(&self) -> bool {
        self.gstat & GMT_BOT != 0
    }

    pub fn at_eof(&self) -> bool {
        self.gstat & GMT_EOF != 0
    }

    pub fn at_eot(&self) -> bool {
        self.gstat & GMT_EOT != 0
    }

    pub fn at_eod(&self) -> bool {
        self.gstat & GMT_EOD != 0
    }

    pub fn write_protected(&self) -> bool {
        self.gstat & GMT_WR_PROT != 0
    }

    pub fn online(&self) -> bool {
        self.gstat & GMT_ONLINE != 0
    }

    pub fn door_open(&self) -> bool {
        self.gstat & GMT_DR_OPEN != 0
    }

    /// Names of the generic status bits that are set
    pub fn flags(&self) -> Vec<&'static str> {
        [
            (GMT_EOF, "EOF"),
            (GMT_BOT, "BOT"),
            (GMT_EOT, "EOT"),
            (GMT_SM, "SM"),
            (GMT_EOD, "EOD"),
            (GMT_WR_PROT, "WR_PROT"),
            (GMT_ONLINE, "ONLINE"),
            (GMT_DR_OPEN, "DR_OPEN"),
            (GMT_IM_REP_EN, "IM_REP_EN"),
            (GMT_CLN, "CLN"),
        ]
        .into_iter()
        .filter(|(bit, _)| self.gstat & bit != 0)
        .map(|(_, name)| name)
        .collect()
    }
}

/// The generic tape-control primitive, distinct from SCSI passthrough
pub trait TapeControl {
    fn tape_op(&self, request: MtRequest) -> io::Result<()>;
    fn tape_status(&self) -> io::Result<MtStatus>;
    /// Current block number (`MTIOCPOS`)
    fn tape_position(&self) -> io::Result<i64>;
}

impl<T: TapeControl + ?Sized> TapeControl for &T {
    fn tape_op(&self, request: MtRequest) -> io::Result<()> {
        (**self).tape_op(request)
    }

    fn tape_status(&self) -> io::Result<MtStatus> {
        (**self).tape_status()
    }

    fn tape_position(&self) -> io::Result<i64> {
        (**self).tape_position()
    }
}

impl<T: TapeControl + ?Sized> TapeControl for &mut T {
    fn tape_op(&self, request: MtRequest) -> io::Result<()> {
        (**self).tape_op(request)
    }

    fn tape_status(&self) -> io::Result<MtStatus> {
        (**self).tape_status()
    }

    fn tape_position(&self) -> io::Result<i64> {
        (**self).tape_position()
    }
}

/// Named tape operations on top of [`TapeControl`]
pub trait TapeOps: TapeControl {
    fn mt(&self, op: MtOperation, count: i32) -> Result<()> {
        debug!("MTIOCTOP {:?} count={}", op, count);
        self.tape_op(MtRequest::new(op, count))
            .map_err(RustLtfsError::from)
    }

    fn reset(&self) -> Result<()> {
        self.mt(MtOperation::Reset, 0)
    }

    fn fsf(&self, count: i32) -> Result<()> {
        self.mt(MtOperation::Fsf, count)
    }

    fn bsf(&self, count: i32) -> Result<()> {
        self.mt(MtOperation::Bsf, count)
    }

    fn fsfm(&self, count: i32) -> Result<()> {
        self.mt(MtOperation::Fsfm, count)
    }

    fn bsfm(&self, count: i32) -> Result<()> {
        self.mt(MtOperation::Bsfm, count)
    }

    fn fsr(&self, count: i32) -> Result<()> {
        self.mt(MtOperation::Fsr, count)
    }

    fn bsr(&self, count: i32) -> Result<()> {
        self.mt(MtOperation::Bsr, count)
    }

    fn fss(&self, count: i32) -> Result<()> {
        self.mt(MtOperation::Fss, count)
    }

    fn bss(&self, count: i32) -> Result<()> {
        self.mt(MtOperation::Bss, count)
    }

    fn write_filemarks(&self, count: i32) -> Result<()> {
        self.mt(MtOperation::Weof, count)
    }

    fn write_filemarks_immediate(&self, count: i32) -> Result<()> {
        self.mt(MtOperation::WeofImmediate, count)
    }

    fn write_setmarks(&self, count: i32) -> Result<()> {
        self.mt(MtOperation::Wsm, count)
    }

    fn rewind(&self) -> Result<()> {
        self.mt(MtOperation::Rewind, 0)
    }

    fn offline(&self) -> Result<()> {
        self.mt(MtOperation::Offline, 0)
    }

    fn nop(&self) -> Result<()> {
        self.mt(MtOperation::Nop, 0)
    }

    fn retension(&self) -> Result<()> {
        self.mt(MtOperation::Retension, 0)
    }

    fn end_of_media(&self) -> Result<()> {
        self.mt(MtOperation::Eom, 0)
    }

    fn erase(&self) -> Result<()> {
        self.mt(MtOperation::Erase, 0)
    }

    fn set_block_size(&self, size: i32) -> Result<()> {
        self.mt(MtOperation::SetBlock, size)
    }

    fn set_density(&self, density: i32) -> Result<()> {
        self.mt(MtOperation::SetDensity, density)
    }

    fn seek(&self, block: i32) -> Result<()> {
        self.mt(MtOperation::Seek, block)
    }

    /// MTTELL returns its result through a different ioctl on drivers that
    /// support it; use [`TapeControl::tape_position`] instead.
    fn tell(&self) -> Result<i32> {
        Err(RustLtfsError::unsupported("MTTELL is not implemented"))
    }

    fn set_drive_buffer(&self, value: i32) -> Result<()> {
        self.mt(MtOperation::SetDriveBuffer, value)
    }

    fn set_options(&self, options: DriveOptions) -> Result<()> {
        self.mt(MtOperation::SetDriveBuffer, options.bits() as i32)
    }

    fn set_partition(&self, partition: i32) -> Result<()> {
        self.mt(MtOperation::SetPartition, partition)
    }

    fn make_partitions(&self, partitions: i32) -> Result<()> {
        self.mt(MtOperation::MakePartition, partitions)
    }

    fn lock(&self) -> Result<()> {
        self.mt(MtOperation::Lock, 0)
    }

    fn unlock(&self) -> Result<()> {
        self.mt(MtOperation::Unlock, 0)
    }

    fn load(&self) -> Result<()> {
        self.mt(MtOperation::Load, 0)
    }

    fn unload(&self) -> Result<()> {
        self.mt(MtOperation::Unload, 0)
    }

    fn set_compression(&self, enable: bool) -> Result<()> {
        self.mt(MtOperation::Compression, enable as i32)
    }

    fn status(&self) -> Result<MtStatus> {
        self.tape_status().map_err(RustLtfsError::from)
    }

    fn block_position(&self) -> Result<i64> {
        self.tape_position().map_err(RustLtfsError::from)
    }
}

impl<T: TapeControl + ?Sized> TapeOps for T {}

/// MT_ST_BOOLEANS selector of MTSETDRVBUFFER
pub const MT_ST_BOOLEANS: u32 = 0x1000_0000;

/// st driver option flags settable through MT_ST_BOOLEANS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveOption {
    BufferWrites = 0x1,
    AsyncWrites = 0x2,
    ReadAhead = 0x4,
    Debugging = 0x8,
    TwoFm = 0x10,
    FastMteom = 0x20,
    AutoLock = 0x40,
    DefWrites = 0x80,
    CanBsr = 0x100,
    NoBlkLims = 0x200,
    CanPartitions = 0x400,
    Scsi2Logical = 0x800,
    Sysv = 0x1000,
    NoWait = 0x2000,
    Sili = 0x4000,
    NoWaitEof = 0x8000,
}

impl DriveOption {
    pub const ALL: [DriveOption; 16] = [
        DriveOption::BufferWrites,
        DriveOption::AsyncWrites,
        DriveOption::ReadAhead,
        DriveOption::Debugging,
        DriveOption::TwoFm,
        DriveOption::FastMteom,
        DriveOption::AutoLock,
        DriveOption::DefWrites,
        DriveOption::CanBsr,
        DriveOption::NoBlkLims,
        DriveOption::CanPartitions,
        DriveOption::Scsi2Logical,
        DriveOption::Sysv,
        DriveOption::NoWait,
        DriveOption::Sili,
        DriveOption::NoWaitEof,
    ];

    /// Name as used by `mt stoptions`
    pub fn name(self) -> &'static str {
        match self {
            DriveOption::BufferWrites => "buffer-writes",
            DriveOption::AsyncWrites => "async-writes",
            DriveOption::ReadAhead => "read-ahead",
            DriveOption::Debugging => "debug",
            DriveOption::TwoFm => "two-fms",
            DriveOption::FastMteom => "fast-eod",
            DriveOption::AutoLock => "auto-lock",
            DriveOption::DefWrites => "def-writes",
            DriveOption::CanBsr => "can-bsr",
            DriveOption::NoBlkLims => "no-blklimits",
            DriveOption::CanPartitions => "can-partitions",
            DriveOption::Scsi2Logical => "scsi2logical",
            DriveOption::Sysv => "sysv",
            DriveOption::NoWait => "no-wait",
            DriveOption::Sili => "sili",
            DriveOption::NoWaitEof => "no-wait-eof",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|opt| opt.name() == name)
    }
}

/// A MT_ST_BOOLEANS word for MTSETDRVBUFFER
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveOptions {
    flags: u32,
}

impl DriveOptions {
    pub fn empty() -> Self {
        Self { flags: 0 }
    }

    /// Options an LTFS reader needs: partitions, logical block addresses,
    /// SILI and correct backspacing after read-ahead
    pub fn ltfs_defaults() -> Self {
        [
            DriveOption::BufferWrites,
            DriveOption::AsyncWrites,
            DriveOption::CanBsr,
            DriveOption::CanPartitions,
            DriveOption::NoWaitEof,
            DriveOption::Scsi2Logical,
            DriveOption::Debugging,
            DriveOption::Sili,
            DriveOption::Sysv,
        ]
        .into_iter()
        .fold(Self::empty(), Self::with)
    }

    pub fn with(mut self, option: DriveOption) -> Self {
        self.flags |= option as u32;
        self
    }

    pub fn contains(&self, option: DriveOption) -> bool {
        self.flags & option as u32 != 0
    }

    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        names.iter().try_fold(Self::empty(), |options, name| {
            DriveOption::from_name(name.as_ref())
                .map(|opt| options.with(opt))
                .ok_or_else(|| {
                    RustLtfsError::config(format!("unknown drive option '{}'", name.as_ref()))
                })
        })
    }

    /// Complete MTSETDRVBUFFER argument
    pub fn bits(&self) -> u32 {
        MT_ST_BOOLEANS | self.flags
    }

    pub fn names(&self) -> Vec<&'static str> {
        DriveOption::ALL
            .into_iter()
            .filter(|opt| self.contains(*opt))
            .map(DriveOption::name)
            .collect()
    }
}

pub fn ioctl_tape_op(fd: RawFd, request: MtRequest) -> io::Result<()> {
    let raw = request.to_bytes();
    unsafe { ioctl_func::mtioctop(fd, &raw) }?;
    Ok(())
}

pub fn ioctl_tape_status(fd: RawFd) -> io::Result<MtStatus> {
    let mut raw = [0u8; MTGET_LEN];
    unsafe { ioctl_func::mtiocget(fd, &mut raw) }?;
    Ok(MtStatus::from_bytes(&raw))
}

pub fn ioctl_tape_position(fd: RawFd) -> io::Result<i64> {
    let mut raw = [0u8; 8];
    unsafe { ioctl_func::mtiocpos(fd, &mut raw) }?;
    Ok(i64::from_ne_bytes(raw))
}
