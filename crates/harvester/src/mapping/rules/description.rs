//! Physical description (300)

use crate::mapping::punctuation::remove_punctuation;
use crate::mapping::{Applied, TransformContext};
use crate::marc::DataField;
use crate::models::Document;

pub fn physical_description(
    doc: &mut Document,
    field: &DataField,
    _ctx: &TransformContext,
) -> Applied {
    let mut applied = Applied::Ignored;

    if doc.extent.is_none() {
        if let Some(extent) = field.first('a') {
            doc.extent = Some(remove_punctuation(extent.trim()));
            applied = Applied::Contributed;
        }
    }

    if let Some(other) = field.first('b') {
        doc.other_material_characteristics = Some(remove_punctuation(other.trim()));
        applied = Applied::Contributed;
    }

    if doc.formats.is_empty() {
        let formats: Vec<String> = field
            .values('c')
            .map(|c| remove_punctuation(c.trim()))
            .filter(|c| !c.is_empty())
            .collect();
        if !formats.is_empty() {
            doc.formats = formats;
            applied = Applied::Contributed;
        }
    }

    applied
}
