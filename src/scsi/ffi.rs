//! Kernel-facing SG_IO header.
//!
//! `sg_io_hdr` is the one structure whose layout the kernel dictates; every
//! buffer it points at (CDB, sense, data) is a plain byte slice owned by the
//! caller of [`issue`].

use std::os::fd::RawFd;

use super::constants::{SENSE_BUFFER_LEN, SG_INTERFACE_ID, SG_IO};
use super::core::PassthroughOutcome;
use super::types::{CommandBlock, DataDirection};

/// `struct sg_io_hdr` from `<scsi/sg.h>`
#[repr(C)]
#[derive(Debug)]
pub struct SgIoHdr {
    pub interface_id: libc::c_int,
    pub dxfer_direction: libc::c_int,
    pub cmd_len: libc::c_uchar,
    pub mx_sb_len: libc::c_uchar,
    pub iovec_count: libc::c_ushort,
    pub dxfer_len: libc::c_uint,
    pub dxferp: *mut libc::c_void,
    pub cmdp: *const libc::c_uchar,
    pub sbp: *mut libc::c_uchar,
    pub timeout: libc::c_uint,
    pub flags: libc::c_uint,
    pub pack_id: libc::c_int,
    pub usr_ptr: *mut libc::c_void,
    pub status: libc::c_uchar,
    pub masked_status: libc::c_uchar,
    pub msg_status: libc::c_uchar,
    pub sb_len_wr: libc::c_uchar,
    pub host_status: libc::c_ushort,
    pub driver_status: libc::c_ushort,
    pub resid: libc::c_int,
    pub duration: libc::c_uint,
    pub info: libc::c_uint,
}

mod ioctl_func {
    use super::SgIoHdr;

    nix::ioctl_readwrite_bad!(sg_io, super::SG_IO, SgIoHdr);
}

/// Issue one SG_IO request on `fd`.
///
/// `data` must be `cmd.transfer_len()` bytes long for transfers and is
/// ignored for [`DataDirection::None`].
pub fn issue(
    fd: RawFd,
    cmd: &CommandBlock,
    direction: DataDirection,
    data: &mut [u8],
) -> PassthroughOutcome {
    let mut sense = [0u8; SENSE_BUFFER_LEN];
    let (dxferp, dxfer_len) = match direction {
        DataDirection::None => (std::ptr::null_mut(), 0),
        _ => (data.as_mut_ptr() as *mut libc::c_void, data.len() as libc::c_uint),
    };

    let mut hdr = SgIoHdr {
        interface_id: SG_INTERFACE_ID,
        dxfer_direction: direction.sg_value(),
        cmd_len: cmd.cdb().len() as libc::c_uchar,
        mx_sb_len: SENSE_BUFFER_LEN as libc::c_uchar,
        iovec_count: 0,
        dxfer_len,
        dxferp,
        cmdp: cmd.cdb().as_ptr(),
        sbp: sense.as_mut_ptr(),
        timeout: cmd.timeout_ms(),
        flags: 0,
        pack_id: 0,
        usr_ptr: std::ptr::null_mut(),
        status: 0,
        masked_status: 0,
        msg_status: 0,
        sb_len_wr: 0,
        host_status: 0,
        driver_status: 0,
        resid: 0,
        duration: 0,
        info: 0,
    };

    // SAFETY: every pointer in `hdr` references a buffer that outlives the call
    let result = unsafe { ioctl_func::sg_io(fd, &mut hdr) };

    PassthroughOutcome {
        os_error: result.err().map(std::io::Error::from),
        sense_len: hdr.sb_len_wr as usize,
        sense,
        resid: hdr.resid,
        status: hdr.status,
        host_status: hdr.host_status,
        driver_status: hdr.driver_status,
    }
}
