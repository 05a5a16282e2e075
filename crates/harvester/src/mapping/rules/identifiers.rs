//! Standard identifiers: ISBN (020) and ISSN (022)

use regex::Regex;
use std::sync::LazyLock;

use crate::mapping::{Applied, TransformContext};
use crate::marc::DataField;
use crate::models::{Document, Identifier};

pub const ISBN_TYPE: &str = "bf:Isbn";
pub const CANCELLED_ISBN_STATUS: &str = "invalid or cancelled";

static PAREN_QUALIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s*\((.*)\)$").expect("qualifier pattern is valid"));

fn build_isbn(raw: &str, field: &DataField, status: Option<&str>) -> Identifier {
    let mut value = raw.trim().to_string();

    let acquisition_terms = field
        .first('c')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    let q_values: Vec<&str> = field.values('q').collect();
    let mut qualifier = (!q_values.is_empty()).then(|| q_values.join(", "));

    let parenthesised = PAREN_QUALIFIER
        .captures(&value)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()));

    if let Some((stripped, inner)) = parenthesised {
        let joined = [Some(inner.as_str()), qualifier.as_deref()]
            .into_iter()
            .flatten()
            .filter(|q| !q.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        qualifier = Some(joined).filter(|q| !q.is_empty());
        value = stripped;
    }

    Identifier {
        identifier_type: ISBN_TYPE.to_string(),
        value,
        qualifier,
        status: status.map(str::to_string),
        acquisition_terms,
    }
}

/// `020 $a` valid ISBNs and `020 $z` invalid or cancelled ones
pub fn isbn(doc: &mut Document, field: &DataField, _ctx: &TransformContext) -> Applied {
    let mut applied = Applied::Ignored;

    let sources = field
        .values('a')
        .map(|v| (v, None))
        .chain(field.values('z').map(|v| (v, Some(CANCELLED_ISBN_STATUS))));

    for (raw, status) in sources {
        if raw.trim().is_empty() {
            continue;
        }
        let identifier = build_isbn(raw, field, status);
        let duplicate = doc.identified_by.iter().any(|existing| {
            existing.identifier_type == ISBN_TYPE
                && existing.value == identifier.value
                && existing.status == identifier.status
        });
        if !duplicate {
            doc.identified_by.push(identifier);
            applied = Applied::Contributed;
        }
    }

    applied
}

/// `022` subfield code -> (identifier type, status)
const ISSN_TABLE: &[(char, &str, Option<&str>)] = &[
    ('a', "bf:Issn", None),
    ('l', "bf:IssnL", None),
    ('m', "bf:IssnL", Some("cancelled")),
    ('y', "bf:Issn", Some("invalid")),
];

pub fn issn(doc: &mut Document, field: &DataField, _ctx: &TransformContext) -> Applied {
    let mut applied = Applied::Ignored;

    for (code, identifier_type, status) in ISSN_TABLE {
        for raw in field.values(*code) {
            let value = raw.trim();
            if value.is_empty() {
                continue;
            }
            doc.identified_by.push(Identifier {
                identifier_type: identifier_type.to_string(),
                value: value.to_string(),
                status: status.map(str::to_string),
                ..Default::default()
            });
            applied = Applied::Contributed;
        }
    }

    applied
}
