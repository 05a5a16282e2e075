//! MARC-XML decoding (MARC21 slim schema)

use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use super::record::{ControlField, DataField, Field, MarcRecord, Subfield};
use crate::error::{HarvestError, Result};

static XMLNS_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\s+xmlns(?::\w+)?="[^"]*""#).expect("xmlns pattern is valid")
});

static NS_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(/?)\w+:").expect("prefix pattern is valid"));

#[derive(Debug, Deserialize)]
struct XmlRecord {
    #[serde(default)]
    leader: String,
    #[serde(default)]
    controlfield: Vec<XmlControlField>,
    #[serde(default)]
    datafield: Vec<XmlDataField>,
}

#[derive(Debug, Deserialize)]
struct XmlControlField {
    #[serde(rename = "@tag")]
    tag: String,
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct XmlDataField {
    #[serde(rename = "@tag")]
    tag: String,
    #[serde(rename = "@ind1", default)]
    ind1: String,
    #[serde(rename = "@ind2", default)]
    ind2: String,
    #[serde(default)]
    subfield: Vec<XmlSubfield>,
}

#[derive(Debug, Deserialize)]
struct XmlSubfield {
    #[serde(rename = "@code")]
    code: String,
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct XmlCollection {
    #[serde(default)]
    record: Vec<XmlRecord>,
}

fn strip_namespaces(xml: &str) -> String {
    let stripped = XMLNS_ATTR.replace_all(xml, "");
    NS_PREFIX.replace_all(&stripped, "<$1").into_owned()
}

fn indicator(value: &str) -> char {
    value.chars().next().unwrap_or(' ')
}

impl From<XmlRecord> for MarcRecord {
    fn from(xml: XmlRecord) -> Self {
        let control = xml.controlfield.into_iter().map(|f| {
            Field::Control(ControlField {
                tag: f.tag,
                value: f.value,
            })
        });

        let data = xml.datafield.into_iter().map(|f| {
            Field::Data(DataField {
                ind1: indicator(&f.ind1),
                ind2: indicator(&f.ind2),
                tag: f.tag,
                subfields: f
                    .subfield
                    .into_iter()
                    .filter_map(|s| {
                        s.code.chars().next().map(|code| Subfield {
                            code,
                            value: s.value,
                        })
                    })
                    .collect(),
            })
        });

        MarcRecord {
            leader: xml.leader,
            fields: control.chain(data).collect(),
        }
    }
}

impl MarcRecord {
    /// Parse a single MARC-XML record.
    ///
    /// Namespace prefixes are ignored. A `<collection>` wrapper is accepted
    /// and its first record returned.
    pub fn from_xml(xml: &str) -> Result<MarcRecord> {
        let cleaned = strip_namespaces(xml);

        if cleaned.contains("<collection") {
            let collection: XmlCollection = from_str(&cleaned)?;
            return collection
                .record
                .into_iter()
                .next()
                .map(MarcRecord::from)
                .ok_or_else(|| HarvestError::Validation("MARC collection is empty".to_string()));
        }

        let record: XmlRecord = from_str(&cleaned)?;
        Ok(record.into())
    }
}
