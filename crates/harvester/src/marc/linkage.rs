//! Alternate graphic representation (`880`) linkage
//!
//! A regular field points at its vernacular twin with `$6 880-NN`; the `880`
//! field points back with `$6 TTT-NN/S` where `S` identifies the script.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use super::record::{DataField, Field, MarcRecord};

static LINKAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{3})-(\d{2,3})(?:/([(\$][A-Za-z0-9]))?(?:/r)?$")
        .expect("linkage pattern is valid")
});

/// Parsed `$6` linkage subfield
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLink {
    pub tag: String,
    pub occurrence: String,
    pub script_code: Option<String>,
}

impl FieldLink {
    pub fn parse(value: &str) -> Option<Self> {
        let caps = LINKAGE.captures(value.trim())?;
        Some(Self {
            tag: caps[1].to_string(),
            occurrence: caps[2].to_string(),
            script_code: caps.get(3).map(|m| m.as_str().to_string()),
        })
    }

    /// ISO 15924 style script name for the MARC script identification code
    pub fn script(&self) -> &'static str {
        match self.script_code.as_deref() {
            Some("(3") => "arab",
            Some("$1") => "hani",
            Some("(N") => "cyrl",
            Some("(S") => "grek",
            Some("(2") => "hebr",
            _ => "latn",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlternateGraphic {
    pub field: DataField,
    pub script: &'static str,
}

/// `880` fields indexed by (linked tag, occurrence number)
#[derive(Debug, Clone, Default)]
pub struct AlternateGraphicIndex {
    entries: HashMap<(String, String), AlternateGraphic>,
}

impl AlternateGraphicIndex {
    pub fn from_record(record: &MarcRecord) -> Self {
        let mut entries = HashMap::new();
        for field in &record.fields {
            let Field::Data(data) = field else { continue };
            if data.tag != "880" {
                continue;
            }
            let Some(link) = data.link() else { continue };
            let script = link.script();
            entries
                .entry((link.tag, link.occurrence))
                .or_insert_with(|| AlternateGraphic {
                    field: data.clone(),
                    script,
                });
        }
        Self { entries }
    }

    /// The `880` twin of a regular field, when that field carries a `$6` link
    pub fn for_field(&self, field: &DataField) -> Option<&AlternateGraphic> {
        let link = field.link()?;
        if link.tag != "880" {
            return None;
        }
        self.entries.get(&(field.tag.clone(), link.occurrence))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
