//! VOL1 label parsing
//!
//! The first record of an LTFS partition is an 80-byte ANSI volume label.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::error::{Result, RustLtfsError};

pub const VOL1_LABEL_LEN: usize = 80;
const VOL1_MAGIC: &[u8; 4] = b"VOL1";

const VOL_ID: (usize, usize) = (4, 6);
const ACCESSIBILITY_AT: usize = 10;
const IMPL_ID: (usize, usize) = (24, 13);
const OWNER_ID: (usize, usize) = (37, 14);
const LABEL_STANDARD_AT: usize = 79;

/// Parsed VOL1 label; fields are stored with their pad bytes trimmed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vol1Label {
    vol_id: String,
    accessibility: u8,
    impl_id: String,
    owner_id: String,
}

impl Vol1Label {
    /// Build a label, truncating each field to its on-tape width
    pub fn new(vol_id: &str, accessibility: u8, impl_id: &str, owner_id: &str) -> Self {
        let clip = |s: &str, width: usize| {
            let mut end = s.len().min(width);
            while !s.is_char_boundary(end) {
                end -= 1;
            }
            s[..end].to_string()
        };
        Self {
            vol_id: clip(vol_id, VOL_ID.1),
            accessibility,
            impl_id: clip(impl_id, IMPL_ID.1),
            owner_id: clip(owner_id, OWNER_ID.1),
        }
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < VOL1_LABEL_LEN {
            return Err(RustLtfsError::format(format!(
                "vol1 label too short ({} bytes)",
                data.len()
            )));
        }
        if &data[..4] != VOL1_MAGIC {
            return Err(RustLtfsError::format("bad vol1 label head"));
        }
        if data.len() != VOL1_LABEL_LEN {
            debug!("VOL1 record is {} bytes, expected 80", data.len());
        }

        let field = |(at, width): (usize, usize)| trim_padding(&data[at..at + width]);
        Ok(Self {
            vol_id: field(VOL_ID),
            accessibility: data[ACCESSIBILITY_AT],
            impl_id: field(IMPL_ID),
            owner_id: field(OWNER_ID),
        })
    }

    pub fn vol_id(&self) -> &str {
        &self.vol_id
    }

    pub fn accessibility(&self) -> u8 {
        self.accessibility
    }

    pub fn impl_id(&self) -> &str {
        &self.impl_id
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Canonical 80-byte label: VolID padded with NUL, text fields with
    /// spaces, label standard version '4'
    pub fn to_bytes(&self) -> [u8; VOL1_LABEL_LEN] {
        let mut raw = [b' '; VOL1_LABEL_LEN];
        raw[..4].copy_from_slice(VOL1_MAGIC);

        let put = |raw: &mut [u8; VOL1_LABEL_LEN], (at, width): (usize, usize), value: &str, pad: u8| {
            let bytes = value.as_bytes();
            raw[at..at + width].fill(pad);
            raw[at..at + bytes.len()].copy_from_slice(bytes);
        };
        put(&mut raw, VOL_ID, &self.vol_id, 0);
        raw[ACCESSIBILITY_AT] = self.accessibility;
        put(&mut raw, IMPL_ID, &self.impl_id, b' ');
        put(&mut raw, OWNER_ID, &self.owner_id, b' ');
        raw[LABEL_STANDARD_AT] = b'4';
        raw
    }
}

impl fmt::Display for Vol1Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Volume ID: {}", self.vol_id)?;
        writeln!(f, "Accessibility: {}", self.accessibility as char)?;
        writeln!(f, "Implementation ID: {}", self.impl_id)?;
        write!(f, "Owner ID: {}", self.owner_id)
    }
}

/// Drop trailing NUL and space pad bytes
fn trim_padding(field: &[u8]) -> String {
    let end = field
        .iter()
        .rposition(|&b| b != 0 && b != b' ')
        .map_or(0, |i| i + 1);
    String::from_utf8_lossy(&field[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ltfs_vol1() -> Vec<u8> {
        let mut raw = vec![b' '; 80];
        raw[..4].copy_from_slice(b"VOL1");
        raw[4..10].copy_from_slice(b"AB12L\0");
        raw[10] = b'L';
        raw[24..37].copy_from_slice(b"LTFS         ");
        raw[37..51].copy_from_slice(b"owner         ");
        raw[79] = b'4';
        raw
    }

    #[test]
    fn test_parse_trims_pad_bytes() {
        let label = Vol1Label::parse(&ltfs_vol1()).unwrap();
        assert_eq!(label.vol_id(), "AB12L");
        assert_eq!(label.accessibility(), b'L');
        assert_eq!(label.impl_id(), "LTFS");
        assert_eq!(label.owner_id(), "owner");
    }

    #[test]
    fn test_round_trip_recovers_fields() {
        let label = Vol1Label::new("000057", b'L', "LTFS", "archive team");
        let raw = label.to_bytes();
        assert_eq!(&raw[..4], b"VOL1");
        assert_eq!(raw[79], b'4');

        let parsed = Vol1Label::parse(&raw).unwrap();
        assert_eq!(parsed, label);
    }

    #[test]
    fn test_short_vol_id_is_nul_padded() {
        let raw = Vol1Label::new("AB1", b'L', "LTFS", "").to_bytes();
        assert_eq!(&raw[4..10], b"AB1\0\0\0");
        assert_eq!(&raw[24..37], b"LTFS         ");
    }

    #[test]
    fn test_rejects_short_or_foreign_labels() {
        for len in [0, 4, 79] {
            let raw = &ltfs_vol1()[..len];
            assert!(matches!(Vol1Label::parse(raw), Err(RustLtfsError::Format(_))));
        }

        let mut raw = ltfs_vol1();
        raw[..4].copy_from_slice(b"HDR1");
        let err = Vol1Label::parse(&raw).unwrap_err();
        assert!(err.to_string().contains("bad vol1 label head"));
    }

    #[test]
    fn test_longer_record_still_parses() {
        let mut raw = ltfs_vol1();
        raw.extend_from_slice(&[0u8; 48]);
        assert_eq!(Vol1Label::parse(&raw).unwrap().vol_id(), "AB12L");
    }

    #[test]
    fn test_new_clips_to_field_width() {
        let label = Vol1Label::new("TOOLONGID", b'L', "LTFS", "");
        assert_eq!(label.vol_id(), "TOOLON");
    }
}
