//! SCSI Commands Module
//!
//! This module contains implementations of the SCSI commands used for
//! sequential tape access.

pub mod basic;
pub mod positioning;
pub mod io;
