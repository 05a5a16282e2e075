//! Document type from leader positions 06 (type of record) and 07
//! (bibliographic level)

use crate::mapping::Applied;
use crate::models::{Document, DocumentType};

/// Classify a record from its leader type/level pair.
///
/// Unrecognised pairs fall back to `Book` for monographic level `m`,
/// otherwise to `Score`.
pub fn classify(type_of_record: char, bibliographic_level: char) -> DocumentType {
    match (type_of_record, bibliographic_level) {
        ('a', 'm') => DocumentType::Book,
        ('a', 's') => DocumentType::Journal,
        ('a', 'a') => DocumentType::Article,
        ('i' | 'j', _) => DocumentType::Sound,
        ('g', _) => DocumentType::Video,
        ('c' | 'd', _) => DocumentType::Score,
        (_, 'm') => DocumentType::Book,
        _ => DocumentType::Score,
    }
}

pub fn document_type(doc: &mut Document, leader: &str) -> Applied {
    let mut positions = leader.chars().skip(6);
    match (positions.next(), positions.next()) {
        (Some(type_of_record), Some(level)) => {
            doc.document_type = Some(classify(type_of_record, level));
            Applied::Contributed
        }
        _ => Applied::Ignored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_pairs() {
        assert_eq!(classify('a', 'm'), DocumentType::Book);
        assert_eq!(classify('a', 's'), DocumentType::Journal);
        assert_eq!(classify('a', 'a'), DocumentType::Article);
        assert_eq!(classify('j', 'm'), DocumentType::Sound);
        assert_eq!(classify('g', 's'), DocumentType::Video);
        assert_eq!(classify('c', 'm'), DocumentType::Score);
    }

    #[test]
    fn test_asymmetric_fallback() {
        assert_eq!(classify('k', 'm'), DocumentType::Book);
        assert_eq!(classify('a', 'c'), DocumentType::Score);
        assert_eq!(classify('t', 's'), DocumentType::Score);
    }

    #[test]
    fn test_every_ascii_pair_is_classified() {
        let all = [
            DocumentType::Book,
            DocumentType::Journal,
            DocumentType::Article,
            DocumentType::Sound,
            DocumentType::Video,
            DocumentType::Score,
        ];
        for t in (0x20u8..0x7f).map(char::from) {
            for l in (0x20u8..0x7f).map(char::from) {
                assert!(all.contains(&classify(t, l)));
            }
        }
    }

    #[test]
    fn test_short_leader_leaves_type_unset() {
        let mut doc = Document::default();
        assert_eq!(document_type(&mut doc, "00000n"), Applied::Ignored);
        assert_eq!(doc.document_type, None);

        assert_eq!(
            document_type(&mut doc, "00000nas a2200000 a 4500"),
            Applied::Contributed
        );
        assert_eq!(doc.document_type, Some(DocumentType::Journal));
    }
}
