//! LTFS Index Module
//!
//! Data model of the `<ltfslabel>` and `<ltfsindex>` records.
//!
//! ## Structure
//! - `types`: label and index structures plus tree queries
//! - `parser`: record bytes / XML to structures
//! - `serializer`: structures to XML
//! - `validator`: consistency warnings

pub mod types;
pub mod parser;
pub mod validator;
pub mod serializer;

pub use parser::{contains_index_marker, INDEX_MARKER, LABEL_MARKER};
pub use types::{
    partition_number, Directory, DirectoryContents, Entry, ExtendedAttribute,
    ExtendedAttributes, ExtentInfo, File, FileExtent, LabelLocation, Location, LtfsIndex,
    LtfsLabel, PartitionMap,
};
pub use validator::IndexWarning;
