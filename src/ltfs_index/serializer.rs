//! LTFS Label and Index XML Serializer
//!
//! Emits the same element names the parser reads, so that modelled fields
//! survive a parse / serialize cycle unchanged.

use serde::Serialize;
use tracing::debug;

use super::types::{LtfsIndex, LtfsLabel};
use crate::error::{Result, RustLtfsError};

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

fn to_xml_document<T: Serialize>(value: &T, what: &str) -> Result<String> {
    let body = quick_xml::se::to_string(value).map_err(|e| {
        RustLtfsError::parse(format!("failed to serialize {} to XML: {}", what, e))
    })?;
    let document = format!("{}{}\n", XML_DECLARATION, body);
    debug!("Serialized {} to XML ({} bytes)", what, document.len());
    Ok(document)
}

impl LtfsIndex {
    pub fn to_xml(&self) -> Result<String> {
        to_xml_document(self, "LTFS index")
    }
}

impl LtfsLabel {
    pub fn to_xml(&self) -> Result<String> {
        to_xml_document(self, "LTFS label")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ltfs_index::parser::tests::{index_xml, LABEL_XML};

    #[test]
    fn test_index_survives_serialize_cycle() {
        let index = LtfsIndex::from_xml(&index_xml(4)).unwrap();
        let xml = index.to_xml().unwrap();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<ltfsindex version=\"2.4.0\">"));
        assert!(xml.contains("<generationnumber>4</generationnumber>"));
        assert!(xml.contains("<updatetime>2024-01-02T03:04:05.000000000Z</updatetime>"));

        let reparsed = LtfsIndex::from_xml(&xml).unwrap();
        assert_eq!(reparsed, index);
    }

    #[test]
    fn test_label_survives_serialize_cycle() {
        let label = LtfsLabel::from_xml(LABEL_XML).unwrap();
        let xml = label.to_xml().unwrap();
        assert!(xml.contains("<blocksize>524288</blocksize>"));
        assert_eq!(LtfsLabel::from_xml(&xml).unwrap(), label);
    }

    #[test]
    fn test_names_needing_escapes_are_percent_encoded() {
        let mut index = LtfsIndex::from_xml(&index_xml(4)).unwrap();
        index.root_directory.contents.files[1].name = "bell\u{7}100%".to_string();

        let xml = index.to_xml().unwrap();
        assert!(xml.contains("<name percentencoded=\"true\">bell%07100%25</name>"));
        assert!(xml.contains("<name>first.bin</name>"));
        assert_eq!(LtfsIndex::from_xml(&xml).unwrap(), index);
    }
}
