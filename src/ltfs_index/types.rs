//! LTFS Label and Index Type Definitions
//!
//! Field and element names follow the LTFS format; timestamps are kept as
//! the strings found on tape so a re-serialized record carries them verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, RustLtfsError};

/// `<ltfslabel>` record following VOL1 on each partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "ltfslabel")]
pub struct LtfsLabel {
    #[serde(rename = "@version")]
    pub version: String,
    #[serde(default)]
    pub creator: String,
    #[serde(rename = "formattime", default)]
    pub format_time: String,
    #[serde(rename = "volumeuuid", default)]
    pub volume_uuid: String,
    pub location: LabelLocation,
    pub partitions: PartitionMap,
    #[serde(default)]
    pub blocksize: u32,
    #[serde(default)]
    pub compression: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelLocation {
    pub partition: String,
}

/// Which partition letter holds the index and which holds data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionMap {
    pub index: String,
    pub data: String,
}

impl LtfsLabel {
    pub fn parsed_uuid(&self) -> Result<Uuid> {
        parse_uuid(&self.volume_uuid)
    }

    pub fn parsed_format_time(&self) -> Result<DateTime<Utc>> {
        parse_timestamp(&self.format_time)
    }

    /// SCSI partition number of the index partition
    pub fn index_partition(&self) -> Option<u8> {
        partition_number(&self.partitions.index)
    }

    /// SCSI partition number of the data partition
    pub fn data_partition(&self) -> Option<u8> {
        partition_number(&self.partitions.data)
    }
}

/// `<ltfsindex>`: one generation of the volume metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "ltfsindex")]
pub struct LtfsIndex {
    #[serde(rename = "@version")]
    pub version: String,
    #[serde(default)]
    pub creator: String,
    #[serde(rename = "volumeuuid", default)]
    pub volume_uuid: String,
    #[serde(rename = "generationnumber")]
    pub generation_number: u64,
    #[serde(rename = "updatetime", default)]
    pub update_time: String,
    pub location: Location,
    #[serde(
        rename = "previousgenerationlocation",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub previous_generation_location: Option<Location>,
    #[serde(rename = "allowpolicyupdate", default)]
    pub allow_policy_update: bool,
    #[serde(
        rename = "volumelockstate",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub volume_lock_state: Option<String>,
    #[serde(rename = "highestfileuid", default)]
    pub highest_file_uid: u64,
    #[serde(rename = "directory")]
    pub root_directory: Directory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub partition: String,
    #[serde(alias = "startBlock", alias = "start_block")]
    pub startblock: u64,
}

impl Location {
    pub fn partition_number(&self) -> Option<u8> {
        partition_number(&self.partition)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directory {
    #[serde(with = "percent_name")]
    pub name: String,
    #[serde(rename = "readonly", default)]
    pub read_only: bool,
    #[serde(rename = "creationtime", default, skip_serializing_if = "String::is_empty")]
    pub creation_time: String,
    #[serde(rename = "changetime", default, skip_serializing_if = "String::is_empty")]
    pub change_time: String,
    #[serde(rename = "modifytime", default, skip_serializing_if = "String::is_empty")]
    pub modify_time: String,
    #[serde(rename = "accesstime", default, skip_serializing_if = "String::is_empty")]
    pub access_time: String,
    #[serde(rename = "backuptime", default, skip_serializing_if = "String::is_empty")]
    pub backup_time: String,
    #[serde(rename = "fileuid", default)]
    pub uid: u64,
    #[serde(default)]
    pub contents: DirectoryContents,
}

/// Children of a directory; `<file>` and `<directory>` may interleave
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DirectoryContents {
    #[serde(rename = "file", default)]
    pub files: Vec<File>,
    #[serde(rename = "directory", default)]
    pub directories: Vec<Directory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    #[serde(with = "percent_name")]
    pub name: String,
    #[serde(default)]
    pub length: u64,
    #[serde(rename = "readonly", default)]
    pub read_only: bool,
    #[serde(rename = "openforwrite", default)]
    pub open_for_write: bool,
    #[serde(rename = "creationtime", default, skip_serializing_if = "String::is_empty")]
    pub creation_time: String,
    #[serde(rename = "changetime", default, skip_serializing_if = "String::is_empty")]
    pub change_time: String,
    #[serde(rename = "modifytime", default, skip_serializing_if = "String::is_empty")]
    pub modify_time: String,
    #[serde(rename = "accesstime", default, skip_serializing_if = "String::is_empty")]
    pub access_time: String,
    #[serde(rename = "backuptime", default, skip_serializing_if = "String::is_empty")]
    pub backup_time: String,
    #[serde(rename = "fileuid", default)]
    pub uid: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symlink: Option<String>,
    #[serde(
        rename = "extendedattributes",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub extended_attributes: Option<ExtendedAttributes>,
    #[serde(
        rename = "extentinfo",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub extent_info: Option<ExtentInfo>,
}

impl File {
    pub fn extents(&self) -> &[FileExtent] {
        self.extent_info
            .as_ref()
            .map(|info| info.extents.as_slice())
            .unwrap_or(&[])
    }

    pub fn xattr(&self, key: &str) -> Option<&str> {
        self.extended_attributes
            .as_ref()?
            .attributes
            .iter()
            .find(|attr| attr.key == key)
            .map(|attr| attr.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ExtentInfo {
    #[serde(rename = "extent", default)]
    pub extents: Vec<FileExtent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileExtent {
    #[serde(rename = "fileoffset", default)]
    pub file_offset: u64,
    pub partition: String,
    #[serde(rename = "startblock", alias = "startBlock", alias = "start_block")]
    pub start_block: u64,
    #[serde(rename = "byteoffset", default)]
    pub byte_offset: u64,
    #[serde(rename = "bytecount")]
    pub byte_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ExtendedAttributes {
    #[serde(rename = "xattr", default)]
    pub attributes: Vec<ExtendedAttribute>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedAttribute {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// A node found by [`LtfsIndex::find`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Entry<'a> {
    File(&'a File),
    Directory(&'a Directory),
}

impl LtfsIndex {
    pub fn parsed_uuid(&self) -> Result<Uuid> {
        parse_uuid(&self.volume_uuid)
    }

    pub fn parsed_update_time(&self) -> Result<DateTime<Utc>> {
        parse_timestamp(&self.update_time)
    }

    pub fn count_files(&self) -> usize {
        self.root_directory.count_files()
    }

    pub fn count_directories(&self) -> usize {
        self.root_directory.count_directories()
    }

    /// Sum of file lengths in bytes
    pub fn total_size(&self) -> u64 {
        self.root_directory.total_size()
    }

    /// Look up a `/`-separated path below the root directory
    pub fn find(&self, path: &str) -> Option<Entry<'_>> {
        let mut components = path.split('/').filter(|c| !c.is_empty() && *c != ".");
        let mut dir = &self.root_directory;
        let Some(mut name) = components.next() else {
            return Some(Entry::Directory(dir));
        };
        loop {
            match components.next() {
                None => {
                    if let Some(file) = dir.contents.files.iter().find(|f| f.name == name) {
                        return Some(Entry::File(file));
                    }
                    return dir.subdirectory(name).map(Entry::Directory);
                }
                Some(next) => {
                    dir = dir.subdirectory(name)?;
                    name = next;
                }
            }
        }
    }
}

impl Directory {
    pub fn subdirectory(&self, name: &str) -> Option<&Directory> {
        self.contents.directories.iter().find(|d| d.name == name)
    }

    pub fn count_files(&self) -> usize {
        self.contents.files.len()
            + self
                .contents
                .directories
                .iter()
                .map(Directory::count_files)
                .sum::<usize>()
    }

    /// Directories below this one, not counting itself
    pub fn count_directories(&self) -> usize {
        self.contents
            .directories
            .iter()
            .map(|d| 1 + d.count_directories())
            .sum()
    }

    pub fn total_size(&self) -> u64 {
        self.contents.files.iter().map(|f| f.length).sum::<u64>()
            + self
                .contents
                .directories
                .iter()
                .map(Directory::total_size)
                .sum::<u64>()
    }
}

/// `<name percentencoded="true">`: names are decoded on parse and encoded
/// again on write when they hold control characters
mod percent_name {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Deserialize)]
    struct RawName {
        #[serde(rename = "@percentencoded", default)]
        percent_encoded: bool,
        #[serde(rename = "$text", default)]
        value: String,
    }

    #[derive(Serialize)]
    struct EncodedName<'a> {
        #[serde(rename = "@percentencoded", skip_serializing_if = "is_false")]
        percent_encoded: bool,
        #[serde(rename = "$text")]
        value: &'a str,
    }

    fn is_false(value: &bool) -> bool {
        !*value
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        let raw = RawName::deserialize(deserializer)?;
        if raw.percent_encoded {
            decode(&raw.value).map_err(D::Error::custom)
        } else {
            Ok(raw.value)
        }
    }

    pub fn serialize<S: Serializer>(name: &str, serializer: S) -> Result<S::Ok, S::Error> {
        if name.chars().any(char::is_control) {
            let encoded = encode(name);
            EncodedName {
                percent_encoded: true,
                value: &encoded,
            }
            .serialize(serializer)
        } else {
            EncodedName {
                percent_encoded: false,
                value: name,
            }
            .serialize(serializer)
        }
    }

    pub(super) fn encode(name: &str) -> String {
        let mut out = String::with_capacity(name.len());
        for c in name.chars() {
            if c.is_control() || c == '%' {
                let mut utf8 = [0u8; 4];
                for byte in c.encode_utf8(&mut utf8).bytes() {
                    out.push_str(&format!("%{:02X}", byte));
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    pub(super) fn decode(value: &str) -> Result<String, String> {
        let bytes = value.as_bytes();
        let mut out = Vec::with_capacity(bytes.len());
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'%' {
                let byte = bytes
                    .get(i + 1..i + 3)
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                    .ok_or_else(|| format!("bad percent escape in name '{}'", value))?;
                out.push(byte);
                i += 3;
            } else {
                out.push(bytes[i]);
                i += 1;
            }
        }
        String::from_utf8(out).map_err(|_| format!("percent-encoded name '{}' is not UTF-8", value))
    }
}

/// LTFS partition letter to SCSI partition number ('a' is 0)
pub fn partition_number(id: &str) -> Option<u8> {
    match id.as_bytes() {
        [c @ b'a'..=b'z'] => Some(c - b'a'),
        [c @ b'A'..=b'Z'] => Some(c - b'A'),
        _ => None,
    }
}

fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value.trim())
        .map_err(|e| RustLtfsError::parse(format!("invalid volume uuid '{}': {}", value, e)))
}

/// LTFS timestamps are RFC 3339 in UTC with up to nanosecond precision
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| RustLtfsError::parse(format!("invalid timestamp '{}': {}", value, e)))
}
