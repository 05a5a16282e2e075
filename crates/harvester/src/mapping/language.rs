//! Language codes and language-script tags

use tracing::warn;

use super::context::TransformContext;
use crate::models::{Language, UNDETERMINED_LANGUAGE};

fn is_language_code(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_lowercase())
}

/// Coerce a raw code to a valid three-letter code or the sentinel
pub fn normalize_code(raw: &str) -> String {
    let code = raw.trim();
    if is_language_code(code) {
        code.to_string()
    } else {
        UNDETERMINED_LANGUAGE.to_string()
    }
}

/// Ordered, distinct record languages from `008/35-37` then `041 $a`.
///
/// Never empty: with no usable source the sentinel is returned alone.
pub fn record_languages(ctx: &TransformContext) -> Vec<Language> {
    let mut codes: Vec<String> = Vec::new();

    let sources = ctx
        .lang_from_008
        .iter()
        .chain(ctx.langs_from_041_a.iter());

    for raw in sources {
        let code = normalize_code(raw);
        if !codes.contains(&code) {
            codes.push(code);
        }
    }

    if codes.is_empty() {
        codes.push(UNDETERMINED_LANGUAGE.to_string());
    }

    codes.into_iter().map(Language::new).collect()
}

fn languages_for_script(script: &str) -> &'static [&'static str] {
    match script {
        "arab" => &["ara", "per"],
        "cyrl" => &["bel", "chu", "mac", "rus", "srp", "ukr"],
        "grek" => &["grc", "gre"],
        "hani" => &["chi", "jpn"],
        "hebr" => &["heb", "lad", "yid"],
        "jpan" => &["jpn"],
        "kore" => &["kor"],
        "zyyy" => &["chi"],
        _ => &[],
    }
}

/// `<lang>-<script>` for the first record language written in `script`,
/// otherwise `und-<script>`.
pub fn language_script(script: &str, ctx: &TransformContext) -> String {
    let compatible = languages_for_script(script);
    if compatible.is_empty() {
        return format!("{UNDETERMINED_LANGUAGE}-{script}");
    }

    let candidates = ctx
        .lang_from_008
        .iter()
        .chain(ctx.langs_from_041_a.iter())
        .chain(ctx.langs_from_041_h.iter());

    for lang in candidates {
        if compatible.contains(&lang.as_str()) {
            return format!("{lang}-{script}");
        }
    }

    warn!(
        bib_id = ctx.bib_id.as_deref().unwrap_or_default(),
        script,
        lang_008 = ?ctx.lang_from_008,
        langs_041_a = ?ctx.langs_from_041_a,
        langs_041_h = ?ctx.langs_from_041_h,
        "No record language matches script"
    );
    format!("{UNDETERMINED_LANGUAGE}-{script}")
}
