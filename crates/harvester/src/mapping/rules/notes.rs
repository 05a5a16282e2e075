//! Series, notes, abstracts, subjects and links to related resources

use crate::mapping::{Applied, TransformContext};
use crate::marc::DataField;
use crate::models::{Document, ElectronicLocation, Series};

fn joined(field: &DataField, code: char, separator: &str) -> Option<String> {
    let parts: Vec<&str> = field
        .values(code)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect();
    (!parts.is_empty()).then(|| parts.join(separator))
}

fn first_non_empty(field: &DataField, code: char) -> Option<String> {
    field
        .values(code)
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn series(doc: &mut Document, field: &DataField, _ctx: &TransformContext) -> Applied {
    let series = Series {
        name: joined(field, 'a', ", "),
        number: joined(field, 'v', ", "),
    };
    if series == Series::default() {
        return Applied::Ignored;
    }
    doc.series.push(series);
    Applied::Contributed
}

pub fn note(doc: &mut Document, field: &DataField, _ctx: &TransformContext) -> Applied {
    match first_non_empty(field, 'a') {
        Some(note) => {
            doc.notes.push(note);
            Applied::Contributed
        }
        None => Applied::Ignored,
    }
}

pub fn abstracts(doc: &mut Document, field: &DataField, _ctx: &TransformContext) -> Applied {
    match joined(field, 'a', ", ") {
        Some(text) => {
            doc.abstracts.push(text);
            Applied::Contributed
        }
        None => Applied::Ignored,
    }
}

/// Subjects from several vocabularies collapse to one entry per text
pub fn subjects(doc: &mut Document, field: &DataField, _ctx: &TransformContext) -> Applied {
    match joined(field, 'a', ", ") {
        Some(subject) if !doc.subjects.contains(&subject) => {
            doc.subjects.push(subject);
            Applied::Contributed
        }
        _ => Applied::Ignored,
    }
}

pub fn is_part_of(doc: &mut Document, field: &DataField, _ctx: &TransformContext) -> Applied {
    if doc.is_part_of.is_some() {
        return Applied::Ignored;
    }
    match first_non_empty(field, 't') {
        Some(host) => {
            doc.is_part_of = Some(host);
            Applied::Contributed
        }
        None => Applied::Ignored,
    }
}

pub fn electronic_location(
    doc: &mut Document,
    field: &DataField,
    _ctx: &TransformContext,
) -> Applied {
    let mut applied = Applied::Ignored;
    for uri in field.values('u').map(str::trim).filter(|u| !u.is_empty()) {
        doc.electronic_location.push(ElectronicLocation {
            uri: uri.to_string(),
        });
        applied = Applied::Contributed;
    }
    applied
}

pub fn cover_art(doc: &mut Document, field: &DataField, _ctx: &TransformContext) -> Applied {
    if doc.cover_art.is_some() {
        return Applied::Ignored;
    }
    match first_non_empty(field, 'u') {
        Some(uri) => {
            doc.cover_art = Some(uri);
            Applied::Contributed
        }
        None => Applied::Ignored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> TransformContext {
        TransformContext::default()
    }

    #[test]
    fn test_series_joins_repeated_subfields() {
        let mut doc = Document::default();
        let field = DataField::new("490", '1', ' ')
            .with_subfield('a', "Collection Folio")
            .with_subfield('a', "Histoire")
            .with_subfield('v', "12");

        series(&mut doc, &field, &ctx());

        assert_eq!(
            doc.series,
            vec![Series {
                name: Some("Collection Folio, Histoire".to_string()),
                number: Some("12".to_string()),
            }]
        );
    }

    #[test]
    fn test_subjects_deduplicated_across_fields() {
        let mut doc = Document::default();
        let lcsh = DataField::new("650", ' ', '0').with_subfield('a', "Photography");
        let local = DataField::new("650", ' ', '6').with_subfield('a', "Photography");
        let other = DataField::new("651", ' ', '0').with_subfield('a', "Switzerland");

        for field in [&lcsh, &local, &other] {
            subjects(&mut doc, field, &ctx());
        }

        assert_eq!(doc.subjects, vec!["Photography", "Switzerland"]);
    }

    #[test]
    fn test_first_host_and_cover_win() {
        let mut doc = Document::default();
        is_part_of(&mut doc, &DataField::new("773", '0', ' ').with_subfield('t', "Revue A"), &ctx());
        is_part_of(&mut doc, &DataField::new("773", '0', ' ').with_subfield('t', "Revue B"), &ctx());
        cover_art(&mut doc, &DataField::new("956", '4', ' ').with_subfield('u', "http://img/1.jpg"), &ctx());
        cover_art(&mut doc, &DataField::new("956", '4', ' ').with_subfield('u', "http://img/2.jpg"), &ctx());

        assert_eq!(doc.is_part_of.as_deref(), Some("Revue A"));
        assert_eq!(doc.cover_art.as_deref(), Some("http://img/1.jpg"));
    }

    #[test]
    fn test_every_electronic_location_kept() {
        let mut doc = Document::default();
        let field = DataField::new("856", '4', '0')
            .with_subfield('u', "http://a.example")
            .with_subfield('u', "http://b.example");

        electronic_location(&mut doc, &field, &ctx());
        assert_eq!(doc.electronic_location.len(), 2);
    }

    #[test]
    fn test_note_and_abstract() {
        let mut doc = Document::default();
        note(&mut doc, &DataField::new("500", ' ', ' ').with_subfield('a', "Bibliogr.: p. 300"), &ctx());
        abstracts(
            &mut doc,
            &DataField::new("520", ' ', ' ')
                .with_subfield('a', "Part one")
                .with_subfield('a', "part two"),
            &ctx(),
        );

        assert_eq!(doc.notes, vec!["Bibliogr.: p. 300"]);
        assert_eq!(doc.abstracts, vec!["Part one, part two"]);
    }
}
