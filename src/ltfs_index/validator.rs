//! LTFS Index Validation
//!
//! Consistency checks run after an index is read. Problems are reported as
//! warnings: a damaged index is still the best metadata there is.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, warn};

use super::types::*;

/// One consistency problem found in an index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexWarning {
    /// Extents of a file leave `[offset, offset + len)` uncovered
    ExtentGap { path: String, offset: u64, len: u64 },
    /// Extents overlap or run past the file length
    ExtentOverrun { path: String, covered: u64, length: u64 },
    BadExtentPartition { path: String, partition: String },
    DuplicateUid { uid: u64, first: String, second: String },
    /// `highestfileuid` is lower than a UID in use
    HighestUidTooLow { declared: u64, seen: u64 },
    DuplicateName { directory: String, name: String },
    BadTimestamp { path: String, field: &'static str, value: String },
    /// Label and index disagree on the volume UUID
    VolumeUuidMismatch { label: String, index: String },
}

impl fmt::Display for IndexWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexWarning::ExtentGap { path, offset, len } => {
                write!(f, "{}: {} bytes at offset {} not covered by any extent", path, len, offset)
            }
            IndexWarning::ExtentOverrun { path, covered, length } => {
                write!(f, "{}: extents cover {} bytes of a {} byte file", path, covered, length)
            }
            IndexWarning::BadExtentPartition { path, partition } => {
                write!(f, "{}: extent on unknown partition '{}'", path, partition)
            }
            IndexWarning::DuplicateUid { uid, first, second } => {
                write!(f, "uid {} used by both {} and {}", uid, first, second)
            }
            IndexWarning::HighestUidTooLow { declared, seen } => {
                write!(f, "highestfileuid {} is below uid {} in use", declared, seen)
            }
            IndexWarning::DuplicateName { directory, name } => {
                write!(f, "{}: name '{}' appears more than once", directory, name)
            }
            IndexWarning::BadTimestamp { path, field, value } => {
                write!(f, "{}: invalid {} '{}'", path, field, value)
            }
            IndexWarning::VolumeUuidMismatch { label, index } => {
                write!(f, "label volume uuid {} differs from index volume uuid {}", label, index)
            }
        }
    }
}

impl LtfsIndex {
    /// Check extents, UIDs, names and timestamps
    pub fn validate(&self) -> Vec<IndexWarning> {
        let mut checker = Checker::default();
        checker.directory(&self.root_directory, "");

        if let Some((&max_uid, _)) = checker.uids.iter().max_by_key(|(uid, _)| **uid) {
            if self.highest_file_uid != 0 && max_uid > self.highest_file_uid {
                checker.warnings.push(IndexWarning::HighestUidTooLow {
                    declared: self.highest_file_uid,
                    seen: max_uid,
                });
            }
        }

        for warning in &checker.warnings {
            warn!("index generation {}: {}", self.generation_number, warning);
        }
        debug!(
            "Validated index generation {}: {} uids, {} warnings",
            self.generation_number,
            checker.uids.len(),
            checker.warnings.len()
        );
        checker.warnings
    }

    /// Compare volume UUIDs, ignoring case and surrounding whitespace
    pub fn check_volume_uuid(&self, label: &LtfsLabel) -> Option<IndexWarning> {
        let from_label = label.volume_uuid.trim();
        let from_index = self.volume_uuid.trim();
        if from_label.eq_ignore_ascii_case(from_index) {
            return None;
        }
        Some(IndexWarning::VolumeUuidMismatch {
            label: from_label.to_string(),
            index: from_index.to_string(),
        })
    }
}

#[derive(Default)]
struct Checker {
    uids: HashMap<u64, String>,
    warnings: Vec<IndexWarning>,
}

impl Checker {
    fn directory(&mut self, dir: &Directory, parent: &str) {
        let path = if parent.is_empty() {
            "/".to_string()
        } else if parent == "/" {
            format!("/{}", dir.name)
        } else {
            format!("{}/{}", parent, dir.name)
        };

        self.uid(dir.uid, &path);
        self.timestamps(
            &path,
            [
                ("creationtime", &dir.creation_time),
                ("changetime", &dir.change_time),
                ("modifytime", &dir.modify_time),
                ("accesstime", &dir.access_time),
                ("backuptime", &dir.backup_time),
            ],
        );

        let mut names = std::collections::HashSet::new();
        let child_names = dir
            .contents
            .files
            .iter()
            .map(|f| &f.name)
            .chain(dir.contents.directories.iter().map(|d| &d.name));
        for name in child_names {
            if !names.insert(name) {
                self.warnings.push(IndexWarning::DuplicateName {
                    directory: path.clone(),
                    name: name.clone(),
                });
            }
        }

        for file in &dir.contents.files {
            let file_path = if path == "/" {
                format!("/{}", file.name)
            } else {
                format!("{}/{}", path, file.name)
            };
            self.file(file, &file_path);
        }
        for sub in &dir.contents.directories {
            self.directory(sub, &path);
        }
    }

    fn file(&mut self, file: &File, path: &str) {
        self.uid(file.uid, path);
        self.timestamps(
            path,
            [
                ("creationtime", &file.creation_time),
                ("changetime", &file.change_time),
                ("modifytime", &file.modify_time),
                ("accesstime", &file.access_time),
                ("backuptime", &file.backup_time),
            ],
        );
        if file.symlink.is_none() {
            self.extents(file, path);
        }
    }

    fn uid(&mut self, uid: u64, path: &str) {
        if let Some(first) = self.uids.get(&uid) {
            self.warnings.push(IndexWarning::DuplicateUid {
                uid,
                first: first.clone(),
                second: path.to_string(),
            });
        } else {
            self.uids.insert(uid, path.to_string());
        }
    }

    fn timestamps(&mut self, path: &str, fields: [(&'static str, &String); 5]) {
        for (field, value) in fields {
            if !value.is_empty() && parse_timestamp(value).is_err() {
                self.warnings.push(IndexWarning::BadTimestamp {
                    path: path.to_string(),
                    field,
                    value: value.clone(),
                });
            }
        }
    }

    /// Extents sorted by file offset must tile `[0, length)` exactly
    fn extents(&mut self, file: &File, path: &str) {
        let mut extents: Vec<&FileExtent> = file.extents().iter().collect();
        extents.sort_by_key(|e| e.file_offset);

        let mut covered = 0u64;
        let mut overrun = false;
        for extent in extents {
            if partition_number(&extent.partition).is_none() {
                self.warnings.push(IndexWarning::BadExtentPartition {
                    path: path.to_string(),
                    partition: extent.partition.clone(),
                });
            }
            if extent.file_offset > covered {
                self.warnings.push(IndexWarning::ExtentGap {
                    path: path.to_string(),
                    offset: covered,
                    len: extent.file_offset - covered,
                });
            } else if extent.file_offset < covered {
                overrun = true;
            }
            covered = covered.max(extent.file_offset.saturating_add(extent.byte_count));
        }

        if covered < file.length {
            self.warnings.push(IndexWarning::ExtentGap {
                path: path.to_string(),
                offset: covered,
                len: file.length - covered,
            });
        } else if covered > file.length || overrun {
            self.warnings.push(IndexWarning::ExtentOverrun {
                path: path.to_string(),
                covered,
                length: file.length,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ltfs_index::parser::tests::{index_xml, LABEL_XML};

    fn sample() -> LtfsIndex {
        LtfsIndex::from_xml(&index_xml(3)).unwrap()
    }

    #[test]
    fn test_consistent_index_has_no_warnings() {
        assert!(sample().validate().is_empty());
    }

    #[test]
    fn test_extent_gap_is_reported() {
        let mut index = sample();
        let first = &mut index.root_directory.contents.files[0];
        first.extent_info.as_mut().unwrap().extents[1].file_offset = 600_000;
        first.length = 600_000 + 524_288;

        let warnings = index.validate();
        assert_eq!(
            warnings,
            vec![IndexWarning::ExtentGap {
                path: "/first.bin".to_string(),
                offset: 524_288,
                len: 600_000 - 524_288,
            }]
        );
    }

    #[test]
    fn test_missing_tail_is_a_gap() {
        let mut index = sample();
        index.root_directory.contents.files[1].length = 150;
        let warnings = index.validate();
        assert!(matches!(
            &warnings[..],
            [IndexWarning::ExtentGap { offset: 100, len: 50, .. }]
        ));
    }

    #[test]
    fn test_duplicate_uid_and_highest_uid() {
        let mut index = sample();
        index.root_directory.contents.files[1].uid = 2;
        index.root_directory.contents.directories[0].contents.files[0].uid = 9;

        let warnings = index.validate();
        assert!(warnings.contains(&IndexWarning::DuplicateUid {
            uid: 2,
            first: "/first.bin".to_string(),
            second: "/second.bin".to_string(),
        }));
        assert!(warnings.contains(&IndexWarning::HighestUidTooLow {
            declared: 5,
            seen: 9
        }));
    }

    #[test]
    fn test_bad_timestamp_and_duplicate_name() {
        let mut index = sample();
        index.root_directory.contents.files[1].name = "docs".to_string();
        index.root_directory.modify_time = "yesterday".to_string();

        let warnings = index.validate();
        assert!(warnings.contains(&IndexWarning::DuplicateName {
            directory: "/".to_string(),
            name: "docs".to_string(),
        }));
        assert!(warnings
            .iter()
            .any(|w| matches!(w, IndexWarning::BadTimestamp { field: "modifytime", .. })));
    }

    #[test]
    fn test_volume_uuid_check() {
        let label = LtfsLabel::from_xml(LABEL_XML).unwrap();
        let mut index = sample();
        assert_eq!(index.check_volume_uuid(&label), None);

        index.volume_uuid = "00000000-0000-0000-0000-000000000000".to_string();
        let warning = index.check_volume_uuid(&label).unwrap();
        assert!(warning.to_string().contains("differs"));
    }
}
