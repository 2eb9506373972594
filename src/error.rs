use thiserror::Error;

use crate::scsi::SenseData;

pub type Result<T> = std::result::Result<T, RustLtfsError>;

#[derive(Error, Debug)]
pub enum RustLtfsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SCSI sense error: {0}")]
    Sense(SenseData),

    #[error("Tape device error: {0}")]
    TapeDevice(String),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("file too big for {limit} bytes")]
    FileTooBig { limit: usize },

    #[error("index too big for {limit} bytes")]
    IndexTooBig { limit: usize },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("copy interrupted after {buffers} buffers ({bytes} bytes): {source}")]
    CopyInterrupted {
        buffers: u64,
        bytes: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl From<nix::Error> for RustLtfsError {
    fn from(errno: nix::Error) -> Self {
        Self::Io(std::io::Error::from(errno))
    }
}

impl RustLtfsError {
    pub fn tape_device<T: Into<String>>(msg: T) -> Self {
        Self::TapeDevice(msg.into())
    }

    pub fn format<T: Into<String>>(msg: T) -> Self {
        Self::Format(msg.into())
    }

    pub fn parse<T: Into<String>>(msg: T) -> Self {
        Self::Parse(msg.into())
    }

    pub fn protocol<T: Into<String>>(msg: T) -> Self {
        Self::Protocol(msg.into())
    }

    pub fn precondition<T: Into<String>>(msg: T) -> Self {
        Self::Precondition(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }

    pub fn unsupported<T: Into<String>>(msg: T) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Errors raised by the OS or reported by the drive itself.
    pub fn is_device_error(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Sense(_) | Self::TapeDevice(_)
        )
    }

    /// Errors caused by what is (or is not) recorded on the medium.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::Format(_)
                | Self::Parse(_)
                | Self::Protocol(_)
                | Self::FileTooBig { .. }
                | Self::IndexTooBig { .. }
                | Self::Precondition(_)
        )
    }

    /// Sense data carried by a device-reported error, if any.
    pub fn sense(&self) -> Option<&SenseData> {
        match self {
            Self::Sense(sense) => Some(sense),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let device_error = RustLtfsError::tape_device("locate failed");
        assert!(matches!(device_error, RustLtfsError::TapeDevice(_)));
        assert!(device_error.is_device_error());

        let format_error = RustLtfsError::format("bad vol1 label head");
        assert!(format_error.is_format_error());
        assert!(!format_error.is_device_error());
    }

    #[test]
    fn test_nix_errno_becomes_io() {
        let err: RustLtfsError = nix::errno::Errno::EIO.into();
        match err {
            RustLtfsError::Io(io) => assert_eq!(io.raw_os_error(), Some(libc::EIO)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_too_big_messages() {
        let err = RustLtfsError::FileTooBig { limit: 1 << 20 };
        assert_eq!(err.to_string(), "file too big for 1048576 bytes");
        assert!(err.is_format_error());
    }
}
