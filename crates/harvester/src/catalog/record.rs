//! Typed view over a raw catalog record

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::marc::MarcRecord;

/// A location, circulation-category or item-type code.
///
/// The catalog sends these either as JSON numbers or as strings; both
/// forms compare equal once normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CatalogCode(String);

impl CatalogCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CatalogCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CatalogCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(CatalogCode::new(s)),
            Value::Number(n) => Ok(CatalogCode::new(n.to_string())),
            other => Err(serde::de::Error::custom(format!(
                "expected a string or number code, got {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawHolding {
    #[serde(default)]
    pub location: Option<CatalogCode>,
    #[serde(default)]
    pub circulation_category: Option<CatalogCode>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    #[serde(default)]
    pub location: Option<CatalogCode>,
    #[serde(default)]
    pub item_type: Option<CatalogCode>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Catalog record as loaded from the record endpoint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCatalogRecord {
    pub id: String,
    pub is_frbr_group: bool,
    pub is_masked: bool,
    pub marc: MarcRecord,
    pub holdings: Vec<RawHolding>,
    pub items: Vec<RawItem>,
}

/// Wire shape of the record endpoint body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecordPayload {
    #[serde(default)]
    pub marc_xml_data: Option<MarcXmlData>,
    #[serde(default)]
    pub frbr_type: Option<Value>,
    #[serde(default, alias = "isMasked", deserialize_with = "lenient_bool")]
    pub masked: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub items: Vec<RawItem>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub holdings: Vec<RawHolding>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MarcXmlData {
    #[serde(default)]
    pub raw: Option<String>,
}

impl RecordPayload {
    pub fn is_frbr_group(&self) -> bool {
        !matches!(self.frbr_type, None | Some(Value::Null))
    }
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_i64().is_some_and(|n| n != 0),
        Some(Value::String(s)) => matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "y" | "yes"),
        _ => false,
    })
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
