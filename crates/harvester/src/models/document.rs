//! Normalized bibliographic document

use serde::{Deserialize, Serialize};

use crate::error::{HarvestError, Result};

/// Sentinel language code used when no valid code is available
pub const UNDETERMINED_LANGUAGE: &str = "und";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Book,
    Journal,
    Article,
    Sound,
    Video,
    Score,
}

impl DocumentType {
    pub fn as_str(&self) -> &str {
        match self {
            DocumentType::Book => "book",
            DocumentType::Journal => "journal",
            DocumentType::Article => "article",
            DocumentType::Sound => "sound",
            DocumentType::Video => "video",
            DocumentType::Score => "score",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub value: String,
    #[serde(rename = "type")]
    pub language_type: String,
}

impl Language {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            value: code.into(),
            language_type: "bf:Language".to_string(),
        }
    }

    pub fn undetermined() -> Self {
        Self::new(UNDETERMINED_LANGUAGE)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identifier {
    #[serde(rename = "type")]
    pub identifier_type: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquisition_terms: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorType {
    Person,
    Organisation,
}

/// A contributor: either a link to an authority record or literal name data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    #[serde(rename = "type")]
    pub author_type: AuthorType,
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
}

/// A value with an optional `<lang>-<script>` tag for vernacular forms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedValue {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl LocalizedValue {
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            language: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditionStatement {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edition_designation: Vec<LocalizedValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub responsibility: Vec<LocalizedValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityType {
    #[serde(rename = "bf:Publication")]
    Publication,
    #[serde(rename = "bf:Production")]
    Production,
    #[serde(rename = "bf:Distribution")]
    Distribution,
    #[serde(rename = "bf:Manufacture")]
    Manufacture,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(rename = "type")]
    pub place_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatementType {
    #[serde(rename = "bf:Place")]
    Place,
    #[serde(rename = "bf:Agent")]
    Agent,
    #[serde(rename = "Date")]
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    #[serde(rename = "type")]
    pub statement_type: StatementType,
    pub label: Vec<LocalizedValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionActivity {
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub place: Vec<Place>,
    #[serde(default)]
    pub statement: Vec<Statement>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Series {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectronicLocation {
    pub uri: String,
}

/// A bibliographic document as produced by the field-mapping engine.
///
/// Only `pid`, `type`, `title` and `language` are required for ingestion;
/// everything else is optional and omitted from JSON when empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<DocumentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub titles_proper: Vec<String>,
    #[serde(default)]
    pub language: Vec<Language>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identified_by: Vec<Identifier>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<Author>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub copyright_date: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edition_statement: Vec<EditionStatement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provision_activity: Vec<ProvisionActivity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_material_characteristics: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub formats: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub series: Vec<Series>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub abstracts: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_part_of: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub electronic_location: Vec<ElectronicLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_art: Option<String>,
}

impl Document {
    /// Names of the required fields this document lacks
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.pid.as_deref().map_or(true, |p| p.trim().is_empty()) {
            missing.push("pid");
        }
        if self.document_type.is_none() {
            missing.push("type");
        }
        if self.title.as_deref().map_or(true, |t| t.trim().is_empty()) {
            missing.push("title");
        }
        if self.language.is_empty() {
            missing.push("language");
        }
        missing
    }

    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_required();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(HarvestError::Validation(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )))
        }
    }

    pub fn is_journal(&self) -> bool {
        self.document_type == Some(DocumentType::Journal)
    }
}
