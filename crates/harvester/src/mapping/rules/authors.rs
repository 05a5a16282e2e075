//! Contributors from 1XX/7XX name fields

use crate::mapping::punctuation::remove_punctuation;
use crate::mapping::{Applied, TransformContext};
use crate::marc::DataField;
use crate::models::{Author, AuthorType, Document};

/// Main entry 110/111 yields no author; meeting names in 711 count as persons
fn author_type(tag: &str) -> Option<AuthorType> {
    match tag {
        "100" | "700" | "711" => Some(AuthorType::Person),
        "710" => Some(AuthorType::Organisation),
        _ => None,
    }
}

/// One author per name field.
///
/// A resolved authority link replaces the literal name, date and
/// qualifier entirely.
pub fn author(doc: &mut Document, field: &DataField, ctx: &TransformContext) -> Applied {
    let Some(author_type) = author_type(&field.tag) else {
        return Applied::Ignored;
    };
    let Some(name) = field.first('a') else {
        return Applied::Ignored;
    };

    if let Some(link) = ctx.authorities.link_for(field) {
        doc.authors.push(Author {
            author_type,
            reference: Some(link.to_string()),
            name: None,
            date: None,
            qualifier: None,
        });
        return Applied::Contributed;
    }

    let mut full_name = remove_punctuation(name.trim());
    for sub in field.values('b') {
        full_name.push(' ');
        full_name.push_str(&remove_punctuation(sub.trim()));
    }

    let qualifier = match author_type {
        AuthorType::Person => {
            let parts: Vec<&str> = field.values('c').map(str::trim).collect();
            (!parts.is_empty()).then(|| parts.join(" "))
        }
        AuthorType::Organisation => None,
    };

    doc.authors.push(Author {
        author_type,
        reference: None,
        name: Some(full_name),
        date: field.first('d').map(|d| remove_punctuation(d.trim())),
        qualifier,
    });
    Applied::Contributed
}
