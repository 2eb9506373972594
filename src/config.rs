//! Reader configuration
//!
//! Loaded from a JSON file given with `--config`, or from
//! `<config dir>/ltfs-reader/config.json` when that file exists.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, RustLtfsError};
use crate::ltfs::OpenOptions;
use crate::scsi::Timeouts;
use crate::tape_ops::DriveOptions;

const CONFIG_DIR_NAME: &str = "ltfs-reader";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReaderConfig {
    /// Tape node used when a command is given no device
    pub device: Option<String>,
    /// Set the st driver options below before opening a volume
    pub apply_drive_options: bool,
    /// `mt stoptions` style names
    pub drive_options: Vec<String>,
    pub timeouts: Timeouts,
    /// READ POSITION before each index record
    pub capture_positions: bool,
    pub log_format: LogFormat,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            device: None,
            apply_drive_options: true,
            drive_options: DriveOptions::ltfs_defaults()
                .names()
                .into_iter()
                .map(str::to_string)
                .collect(),
            timeouts: Timeouts::default(),
            capture_positions: true,
            log_format: LogFormat::Text,
        }
    }
}

impl ReaderConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Explicit path must exist; the default path is optional
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::from_file(&path),
                _ => {
                    debug!("No configuration file, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::from_json(&text)
            .map_err(|e| RustLtfsError::config(format!("{}: {}", path.display(), e)))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| RustLtfsError::config(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        DriveOptions::from_names(&self.drive_options)?;
        let timeouts = [
            ("control_ms", self.timeouts.control_ms),
            ("locate_ms", self.timeouts.locate_ms),
            ("read_ms", self.timeouts.read_ms),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                return Err(RustLtfsError::config(format!("timeout {} must not be zero", name)));
            }
        }
        Ok(())
    }

    pub fn drive_options(&self) -> Result<DriveOptions> {
        DriveOptions::from_names(&self.drive_options)
    }

    pub fn open_options(&self) -> OpenOptions {
        OpenOptions {
            capture_positions: self.capture_positions,
        }
    }

    /// Command line device wins over the configured one
    pub fn device_path(&self, from_cli: Option<String>) -> Result<String> {
        from_cli
            .or_else(|| self.device.clone())
            .ok_or_else(|| RustLtfsError::config("no tape device given (argument or config \"device\")"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tape_ops::DriveOption;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = ReaderConfig::default();
        config.validate().unwrap();
        assert_eq!(config.drive_options().unwrap(), DriveOptions::ltfs_defaults());
        assert!(config.open_options().capture_positions);
        assert_eq!(config.timeouts, Timeouts::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = ReaderConfig::from_json(
            r#"{"device": "/dev/nst1", "timeouts": {"read_ms": 5000}, "log_format": "json"}"#,
        )
        .unwrap();
        assert_eq!(config.device.as_deref(), Some("/dev/nst1"));
        assert_eq!(config.timeouts.read_ms, 5000);
        assert_eq!(config.timeouts.locate_ms, Timeouts::default().locate_ms);
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.apply_drive_options);
    }

    #[test]
    fn test_unknown_drive_option_is_rejected() {
        let err = ReaderConfig::from_json(r#"{"drive_options": ["sili", "turbo"]}"#).unwrap_err();
        assert!(matches!(err, RustLtfsError::Config(_)));

        let config = ReaderConfig::from_json(r#"{"drive_options": ["sili", "can-bsr"]}"#).unwrap();
        let options = config.drive_options().unwrap();
        assert!(options.contains(DriveOption::Sili));
        assert!(!options.contains(DriveOption::BufferWrites));
    }

    #[test]
    fn test_zero_timeout_and_unknown_field_are_rejected() {
        assert!(matches!(
            ReaderConfig::from_json(r#"{"timeouts": {"control_ms": 0}}"#),
            Err(RustLtfsError::Config(_))
        ));
        assert!(matches!(
            ReaderConfig::from_json(r#"{"devise": "/dev/nst0"}"#),
            Err(RustLtfsError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"device": "/dev/nst2", "capture_positions": false}}"#).unwrap();

        let config = ReaderConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.device_path(None).unwrap(), "/dev/nst2");
        assert_eq!(config.device_path(Some("/dev/nst0".into())).unwrap(), "/dev/nst0");
        assert!(!config.open_options().capture_positions);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ReaderConfig::load(Some(&dir.path().join("absent.json"))).unwrap_err();
        assert!(matches!(err, RustLtfsError::Generic(_)));
        assert!(ReaderConfig::default().device_path(None).is_err());
    }
}
