//! Per-record values shared by all mapping rules

use super::authority::ResolvedAuthorities;
use crate::marc::{AlternateGraphicIndex, MarcRecord};

/// Record-level data computed once before the rule pass
#[derive(Debug, Clone, Default)]
pub struct TransformContext {
    pub bib_id: Option<String>,
    /// `008/35-37`, trimmed; absent when blank or when `008` is too short
    pub lang_from_008: Option<String>,
    pub langs_from_041_a: Vec<String>,
    pub langs_from_041_h: Vec<String>,
    pub date_type: Option<char>,
    pub date1: Option<String>,
    pub date2: Option<String>,
    pub country: Option<String>,
    pub alternate_graphic: AlternateGraphicIndex,
    pub authorities: ResolvedAuthorities,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.chars().all(|c| c == '|'))
        .map(str::to_string)
}

impl TransformContext {
    pub fn from_record(record: &MarcRecord, authorities: ResolvedAuthorities) -> Self {
        let fixed = record.fixed_data();

        let subfields_041 = |code: char| -> Vec<String> {
            record
                .data_fields("041")
                .flat_map(|f| f.values(code))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect()
        };

        let country = non_blank(fixed.country()).filter(|c| c != "xx");

        Self {
            bib_id: record.control("001").map(|id| id.trim().to_string()),
            lang_from_008: fixed.language().and_then(|l| non_blank(Some(l))),
            langs_from_041_a: subfields_041('a'),
            langs_from_041_h: subfields_041('h'),
            date_type: fixed.date_type(),
            date1: fixed.date1().map(str::to_string),
            date2: fixed.date2().map(str::to_string),
            country,
            alternate_graphic: AlternateGraphicIndex::from_record(record),
            authorities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marc::DataField;

    #[test]
    fn test_context_from_record() {
        let record = MarcRecord::new("00000nam a2200000 a 4500")
            .with_control("001", "vtls000000042")
            .with_control("008", "190101q19501959xx            000 0 ||| d")
            .with_field(
                DataField::new("041", '0', ' ')
                    .with_subfield('a', "fre")
                    .with_subfield('h', "ger"),
            );

        let ctx = TransformContext::from_record(&record, ResolvedAuthorities::default());

        assert_eq!(ctx.bib_id.as_deref(), Some("vtls000000042"));
        assert_eq!(ctx.lang_from_008, None);
        assert_eq!(ctx.langs_from_041_a, vec!["fre"]);
        assert_eq!(ctx.langs_from_041_h, vec!["ger"]);
        assert_eq!(ctx.date_type, Some('q'));
        assert_eq!(ctx.date1.as_deref(), Some("1950"));
        assert_eq!(ctx.date2.as_deref(), Some("1959"));
        assert_eq!(ctx.country, None);
    }
}
