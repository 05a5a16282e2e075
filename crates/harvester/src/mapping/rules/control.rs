//! Control field rules: record identifier and languages

use crate::mapping::language::record_languages;
use crate::mapping::{Applied, TransformContext};
use crate::models::Document;

const LEGACY_PREFIX: &str = "vtls";

/// Legacy identifiers look like `vtls000012345`; the prefix and its
/// zero padding are dropped. Other values carry no pid.
pub fn legacy_pid(value: &str) -> Option<String> {
    let value = value.trim();
    let rest = value.strip_prefix(LEGACY_PREFIX)?;
    let unpadded = rest.trim_start_matches('0');
    let pid = if unpadded.len() == rest.len() {
        value
    } else {
        unpadded
    };
    (!pid.is_empty()).then(|| pid.to_string())
}

pub fn pid(doc: &mut Document, value: &str, _ctx: &TransformContext) -> Applied {
    match legacy_pid(value) {
        Some(pid) => {
            doc.pid = Some(pid);
            Applied::Contributed
        }
        None => Applied::Ignored,
    }
}

pub fn language(doc: &mut Document, _value: &str, ctx: &TransformContext) -> Applied {
    doc.language = record_languages(ctx);
    Applied::Contributed
}
