//! Title (245) and uniform titles (130/730)

use crate::mapping::{Applied, TransformContext};
use crate::marc::DataField;
use crate::models::Document;

/// Join the selected subfields in the order they appear in the field
fn join_in_source_order(field: &DataField, codes: &[char]) -> Option<String> {
    let parts: Vec<&str> = field
        .subfields
        .iter()
        .filter(|s| codes.contains(&s.code))
        .map(|s| s.value.trim())
        .filter(|v| !v.is_empty())
        .collect();

    (!parts.is_empty()).then(|| parts.join(" "))
}

pub fn title(doc: &mut Document, field: &DataField, _ctx: &TransformContext) -> Applied {
    if doc.title.is_some() {
        return Applied::Ignored;
    }
    match join_in_source_order(field, &['a', 'b', 'n', 'p', 'c', 'h']) {
        Some(title) => {
            doc.title = Some(title);
            Applied::Contributed
        }
        None => Applied::Ignored,
    }
}

pub fn titles_proper(doc: &mut Document, field: &DataField, _ctx: &TransformContext) -> Applied {
    match join_in_source_order(field, &['a', 'p', 'g', 's']) {
        Some(title) => {
            doc.titles_proper.push(title);
            Applied::Contributed
        }
        None => Applied::Ignored,
    }
}
