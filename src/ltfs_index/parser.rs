//! LTFS Label and Index XML Parser
//!
//! Records come off tape as raw bytes; they are decoded as UTF-8, stripped
//! of trailing NUL padding and handed to quick-xml's serde deserializer.

use tracing::{debug, warn};

use super::types::{LtfsIndex, LtfsLabel};
use crate::error::{Result, RustLtfsError};

pub const INDEX_MARKER: &[u8] = b"<ltfsindex";
pub const LABEL_MARKER: &[u8] = b"<ltfslabel";

/// Whether a raw record looks like an index record
pub fn contains_index_marker(data: &[u8]) -> bool {
    data.windows(INDEX_MARKER.len()).any(|w| w == INDEX_MARKER)
}

/// UTF-8 text of a record without trailing NUL padding
fn record_text<'a>(data: &'a [u8], what: &str) -> Result<&'a str> {
    let end = data
        .iter()
        .rposition(|&b| b != 0)
        .map_or(0, |i| i + 1);
    std::str::from_utf8(&data[..end])
        .map_err(|e| RustLtfsError::parse(format!("{} is not valid UTF-8: {}", what, e)))
}

/// Report a deserializer failure with a short preview of the record
fn xml_error(what: &str, xml: &str, err: quick_xml::DeError) -> RustLtfsError {
    let preview: String = xml.chars().take(200).collect();
    warn!("{} XML parsing failed. Content preview:\n{}", what, preview);
    RustLtfsError::parse(format!(
        "failed to parse {} XML: {} ({} bytes)",
        what,
        err,
        xml.len()
    ))
}

impl LtfsLabel {
    pub fn from_xml(xml: &str) -> Result<Self> {
        if !xml.contains("<ltfslabel") {
            return Err(RustLtfsError::format("record is not an LTFS label"));
        }
        let label: LtfsLabel =
            quick_xml::de::from_str(xml).map_err(|e| xml_error("LTFS label", xml, e))?;
        debug!(
            "Parsed LTFS label: version={}, uuid={}, blocksize={}",
            label.version, label.volume_uuid, label.blocksize
        );
        Ok(label)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_xml(record_text(data, "LTFS label")?)
    }
}

impl LtfsIndex {
    pub fn from_xml(xml: &str) -> Result<Self> {
        debug!("Parsing LTFS index XML, length: {}", xml.len());
        if !xml.contains("<ltfsindex") {
            return Err(RustLtfsError::format("record is not an LTFS index"));
        }

        let index: LtfsIndex =
            quick_xml::de::from_str(xml).map_err(|e| xml_error("LTFS index", xml, e))?;

        if !index.version.starts_with("2.") {
            warn!("LTFS version {} may not be fully supported", index.version);
        }
        debug!(
            "Parsed LTFS index: version={}, generation={}, files={}",
            index.version,
            index.generation_number,
            index.count_files()
        );
        Ok(index)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_xml(record_text(data, "LTFS index")?)
    }
}
