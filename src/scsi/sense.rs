//! SCSI Sense Data Parsing
//!
//! This module handles parsing and interpretation of fixed-format SCSI sense data.

use std::fmt;

use super::constants::SENSE_BUFFER_LEN;

/// Sense key descriptions indexed by the low nibble of sense byte 2
pub const SENSE_KEY_DESCRIPTIONS: [&str; 16] = [
    "NO SENSE",
    "RECOVERED ERROR",
    "NOT READY",
    "MEDIUM ERROR",
    "HARDWARE ERROR",
    "ILLEGAL REQUEST",
    "UNIT ATTENTION",
    "DATA PROTECT",
    "BLANK CHECK",
    "VENDOR SPECIFIC",
    "COPY ABORTED",
    "ABORTED COMMAND",
    "EQUAL",
    "VOLUME OVERFLOW",
    "MISCOMPARE",
    "COMPLETED",
];

pub mod sense_key {
    pub const NO_SENSE: u8 = 0x0;
    pub const RECOVERED_ERROR: u8 = 0x1;
    pub const NOT_READY: u8 = 0x2;
    pub const MEDIUM_ERROR: u8 = 0x3;
    pub const ILLEGAL_REQUEST: u8 = 0x5;
    pub const UNIT_ATTENTION: u8 = 0x6;
    pub const BLANK_CHECK: u8 = 0x8;
}

/// Fixed-format sense buffer as written by the device
#[derive(Clone, PartialEq, Eq)]
pub struct SenseData {
    buffer: [u8; SENSE_BUFFER_LEN],
    len: usize,
}

impl SenseData {
    /// Copy up to `SENSE_BUFFER_LEN` bytes of device-written sense data
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let len = bytes.len().min(SENSE_BUFFER_LEN);
        let mut buffer = [0u8; SENSE_BUFFER_LEN];
        buffer[..len].copy_from_slice(&bytes[..len]);
        Self { buffer, len }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..self.len]
    }

    pub fn response_code(&self) -> u8 {
        self.buffer[0] & 0x7F
    }

    pub fn sense_key(&self) -> u8 {
        self.buffer[2] & 0x0F
    }

    pub fn sense_key_description(&self) -> &'static str {
        SENSE_KEY_DESCRIPTIONS[self.sense_key() as usize]
    }

    /// Additional sense code
    pub fn asc(&self) -> u8 {
        self.buffer[12]
    }

    /// Additional sense code qualifier
    pub fn ascq(&self) -> u8 {
        self.buffer[13]
    }

    pub fn filemark(&self) -> bool {
        self.buffer[2] & 0x80 != 0
    }

    pub fn end_of_medium(&self) -> bool {
        self.buffer[2] & 0x40 != 0
    }

    pub fn incorrect_length(&self) -> bool {
        self.buffer[2] & 0x20 != 0
    }

    /// Information field (bytes 3..7), only meaningful with the VALID bit
    pub fn information(&self) -> Option<i32> {
        if self.buffer[0] & 0x80 == 0 {
            return None;
        }
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.buffer[3..7]);
        Some(i32::from_be_bytes(raw))
    }

    /// Reading ran onto a filemark or past the end of recorded data
    pub fn is_end_of_file(&self) -> bool {
        self.filemark() || self.sense_key() == sense_key::BLANK_CHECK
    }

    /// ASC/ASCQ rendered as `xx/yy`
    pub fn additional_code(&self) -> String {
        format!(
            "{}/{}",
            hex::encode([self.asc()]),
            hex::encode([self.ascq()])
        )
    }
}

impl fmt::Display for SenseData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.sense_key_description(),
            self.additional_code()
        )
    }
}

impl fmt::Debug for SenseData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenseData")
            .field("key", &self.sense_key())
            .field("asc", &self.asc())
            .field("ascq", &self.ascq())
            .field("raw", &hex::encode(self.as_bytes()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_sense(key_byte: u8, asc: u8, ascq: u8) -> Vec<u8> {
        let mut sense = vec![0u8; 18];
        sense[0] = 0x70;
        sense[2] = key_byte;
        sense[7] = 0x0a;
        sense[12] = asc;
        sense[13] = ascq;
        sense
    }

    #[test]
    fn test_sense_key_uses_low_nibble() {
        // FILEMARK | ILI on top of MEDIUM ERROR
        let sense = SenseData::from_bytes(&fixed_sense(0xA3, 0x11, 0x00));
        assert_eq!(sense.sense_key(), sense_key::MEDIUM_ERROR);
        assert_eq!(sense.sense_key_description(), "MEDIUM ERROR");
        assert!(sense.filemark());
        assert!(sense.incorrect_length());
        assert!(!sense.end_of_medium());
    }

    #[test]
    fn test_additional_code_is_hex() {
        let sense = SenseData::from_bytes(&fixed_sense(0x02, 0x3A, 0x00));
        assert_eq!(sense.additional_code(), "3a/00");
        assert_eq!(sense.to_string(), "NOT READY 3a/00");
    }

    #[test]
    fn test_table_has_sixteen_entries() {
        for key in 0u8..16 {
            let sense = SenseData::from_bytes(&fixed_sense(key, 0, 0));
            assert_eq!(sense.sense_key_description(), SENSE_KEY_DESCRIPTIONS[key as usize]);
        }
        assert_eq!(SENSE_KEY_DESCRIPTIONS[0x0d], "VOLUME OVERFLOW");
    }

    #[test]
    fn test_information_requires_valid_bit() {
        let mut raw = fixed_sense(0x80, 0x00, 0x01);
        raw[3..7].copy_from_slice(&(-5i32).to_be_bytes());
        assert_eq!(SenseData::from_bytes(&raw).information(), None);

        raw[0] = 0xF0;
        let sense = SenseData::from_bytes(&raw);
        assert_eq!(sense.information(), Some(-5));
        assert!(sense.is_end_of_file());
    }

    #[test]
    fn test_oversized_buffer_is_truncated() {
        let sense = SenseData::from_bytes(&[0x70; 64]);
        assert_eq!(sense.as_bytes().len(), SENSE_BUFFER_LEN);
    }
}
