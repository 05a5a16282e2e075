//! Holdings, items and the resource links between entities

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::HarvestError;

/// Resolvable reference to another resource (`{"$ref": uri}`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(rename = "$ref")]
    pub reference: String,
}

impl Link {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
        }
    }

    /// `{base}/api/{collection}/{pid}`
    pub fn to_resource(base_url: &str, collection: &str, pid: impl std::fmt::Display) -> Self {
        Self::new(format!(
            "{}/api/{}/{}",
            base_url.trim_end_matches('/'),
            collection,
            pid
        ))
    }
}

/// Persisted entity kinds, in the order they are indexed after a flush
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Document,
    Holding,
    Item,
}

impl EntityKind {
    pub fn as_str(&self) -> &str {
        match self {
            EntityKind::Document => "document",
            EntityKind::Holding => "holding",
            EntityKind::Item => "item",
        }
    }

    /// Collection segment used in resource URIs
    pub fn collection(&self) -> &'static str {
        match self {
            EntityKind::Document => "documents",
            EntityKind::Holding => "holdings",
            EntityKind::Item => "items",
        }
    }

    /// Short pid type, also the export file name
    pub fn pid_type(&self) -> &'static str {
        match self {
            EntityKind::Document => "doc",
            EntityKind::Holding => "hold",
            EntityKind::Item => "item",
        }
    }

    /// Name of the identifier-issuing sequence for this kind
    pub fn sequence_name(&self) -> &'static str {
        match self {
            EntityKind::Document => "document_pid_seq",
            EntityKind::Holding => "holding_pid_seq",
            EntityKind::Item => "item_pid_seq",
        }
    }
}

impl std::str::FromStr for EntityKind {
    type Err = HarvestError;

    /// Accepts the pid type, the kind name or the collection name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "doc" | "document" | "documents" => Ok(EntityKind::Document),
            "hold" | "holding" | "holdings" => Ok(EntityKind::Holding),
            "item" | "items" => Ok(EntityKind::Item),
            other => Err(HarvestError::Validation(format!("unknown pid type {other}"))),
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HoldingsType {
    Standard,
    Serial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<String>,
    pub holdings_type: HoldingsType,
    pub document: Link,
    pub location: Option<Link>,
    pub circulation_category: Option<Link>,

    /// Catalog attributes carried through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<String>,
    pub document: Link,
    pub holding: Option<Link>,
    pub location: Option<Link>,
    pub item_type: Option<Link>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
