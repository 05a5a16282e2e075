//! Harvest work messages

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{HarvestError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HarvestOp {
    Harvest,
    Create,
    Update,
    Delete,
}

impl HarvestOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            HarvestOp::Harvest => "harvest",
            HarvestOp::Create => "create",
            HarvestOp::Update => "update",
            HarvestOp::Delete => "delete",
        }
    }
}

impl FromStr for HarvestOp {
    type Err = HarvestError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "harvest" => Ok(HarvestOp::Harvest),
            "create" => Ok(HarvestOp::Create),
            "update" => Ok(HarvestOp::Update),
            "delete" => Ok(HarvestOp::Delete),
            other => Err(HarvestError::InvalidOperation(other.to_string())),
        }
    }
}

impl fmt::Display for HarvestOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{id, uri, op}` as published on the harvest queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestMessage {
    pub id: String,
    pub uri: String,
    pub op: HarvestOp,
}

impl HarvestMessage {
    pub fn new(op: HarvestOp, id: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uri: uri.into(),
            op,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }
}
