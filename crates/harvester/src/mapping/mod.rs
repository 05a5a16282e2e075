//! MARC21 field-mapping engine
//!
//! A record is turned into a [`Document`] in one pass over its fields.
//! Each field's dispatch key (bare tag for control fields, tag plus both
//! indicators for data fields) is tested against [`RULES`] in table order
//! and the first matching rule is applied. Fields matching no rule are
//! ignored.
//!
//! Authority links for contributors are resolved asynchronously before the
//! pass and handed to the rules through the [`TransformContext`], so the
//! rule functions themselves stay synchronous.

pub mod authority;
pub mod context;
pub mod language;
pub mod punctuation;
pub mod rules;

use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::debug;

use crate::marc::{ControlField, DataField, Field, MarcRecord};
use crate::models::Document;

pub use authority::{AuthorityResolver, MefAuthorityResolver, ResolvedAuthorities};
pub use context::TransformContext;

use rules::{authors, control, description, identifiers, leader, notes, provision, titles};

/// Outcome of applying one rule to one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Contributed,
    Ignored,
}

/// Rule function, typed by the kind of input it accepts
#[derive(Clone, Copy)]
pub enum RuleFn {
    Leader(fn(&mut Document, &str) -> Applied),
    Control(fn(&mut Document, &str, &TransformContext) -> Applied),
    Data(fn(&mut Document, &DataField, &TransformContext) -> Applied),
}

#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub pattern: &'static str,
    pub apply: RuleFn,
}

/// Dispatch key used for the leader
pub const LEADER_KEY: &str = "leader";

/// Mapping rules in dispatch order; the first match wins
pub const RULES: &[Rule] = &[
    Rule { name: "type", pattern: "^leader$", apply: RuleFn::Leader(leader::document_type) },
    Rule { name: "pid", pattern: "^001", apply: RuleFn::Control(control::pid) },
    Rule { name: "language", pattern: "^008", apply: RuleFn::Control(control::language) },
    Rule { name: "isbn", pattern: "^020..", apply: RuleFn::Data(identifiers::isbn) },
    Rule { name: "issn", pattern: "^022..", apply: RuleFn::Data(identifiers::issn) },
    Rule { name: "title", pattern: "^245..", apply: RuleFn::Data(titles::title) },
    Rule { name: "titlesProper", pattern: "^[17]30..", apply: RuleFn::Data(titles::titles_proper) },
    Rule { name: "authors", pattern: "^[17][01][01]..", apply: RuleFn::Data(authors::author) },
    Rule { name: "copyrightDate", pattern: "^264.4", apply: RuleFn::Data(provision::copyright_date) },
    Rule { name: "editionStatement", pattern: "^250..", apply: RuleFn::Data(provision::edition) },
    Rule {
        name: "provisionActivity",
        pattern: "^26[04].[_0-3]",
        apply: RuleFn::Data(provision::provision_activity),
    },
    Rule { name: "description", pattern: "^300..", apply: RuleFn::Data(description::physical_description) },
    Rule { name: "series", pattern: "^4[49]0..", apply: RuleFn::Data(notes::series) },
    Rule { name: "notes", pattern: "^500..", apply: RuleFn::Data(notes::note) },
    Rule { name: "abstracts", pattern: "^520..", apply: RuleFn::Data(notes::abstracts) },
    Rule { name: "subjects", pattern: "^6[0135][01].[06]", apply: RuleFn::Data(notes::subjects) },
    Rule { name: "isPartOf", pattern: "^773..", apply: RuleFn::Data(notes::is_part_of) },
    Rule {
        name: "electronicLocation",
        pattern: "^8564.",
        apply: RuleFn::Data(notes::electronic_location),
    },
    Rule { name: "coverArt", pattern: "^9564.", apply: RuleFn::Data(notes::cover_art) },
];

static COMPILED: LazyLock<Vec<(Regex, &'static Rule)>> = LazyLock::new(|| {
    RULES
        .iter()
        .map(|rule| {
            let regex = Regex::new(rule.pattern).expect("mapping rule patterns are valid");
            (regex, rule)
        })
        .collect()
});

fn find_rule(key: &str) -> Option<&'static Rule> {
    COMPILED
        .iter()
        .find(|(regex, _)| regex.is_match(key))
        .map(|(_, rule)| *rule)
}

/// Per-record tally of the rule pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingReport {
    pub contributed: usize,
    pub ignored: usize,
    pub unmatched: usize,
}

impl MappingReport {
    fn record(&mut self, applied: Applied) {
        match applied {
            Applied::Contributed => self.contributed += 1,
            Applied::Ignored => self.ignored += 1,
        }
    }
}

fn apply_control(doc: &mut Document, field: &ControlField, ctx: &TransformContext) -> Option<Applied> {
    match find_rule(&field.tag)?.apply {
        RuleFn::Control(f) => Some(f(doc, &field.value, ctx)),
        _ => Some(Applied::Ignored),
    }
}

fn apply_data(doc: &mut Document, field: &DataField, ctx: &TransformContext) -> Option<Applied> {
    match find_rule(&field.dispatch_key())?.apply {
        RuleFn::Data(f) => Some(f(doc, field, ctx)),
        _ => Some(Applied::Ignored),
    }
}

/// Run the rule table over a record with a precomputed context
pub fn apply_rules(record: &MarcRecord, ctx: &TransformContext) -> (Document, MappingReport) {
    let mut doc = Document::default();
    let mut report = MappingReport::default();

    if let Some(rule) = find_rule(LEADER_KEY) {
        if let RuleFn::Leader(f) = rule.apply {
            report.record(f(&mut doc, &record.leader));
        }
    }

    for field in &record.fields {
        let applied = match field {
            Field::Control(control) => apply_control(&mut doc, control, ctx),
            Field::Data(data) => apply_data(&mut doc, data, ctx),
        };
        match applied {
            Some(applied) => report.record(applied),
            None => report.unmatched += 1,
        }
    }

    // records without 008 still carry a language
    if doc.language.is_empty() {
        doc.language = language::record_languages(ctx);
    }

    (doc, report)
}

/// Maps MARC records to documents, optionally resolving contributor
/// authorities first
#[derive(Clone, Default)]
pub struct FieldMapper {
    resolver: Option<Arc<dyn AuthorityResolver>>,
}

impl FieldMapper {
    pub fn new(resolver: Option<Arc<dyn AuthorityResolver>>) -> Self {
        Self { resolver }
    }

    pub async fn map(&self, record: &MarcRecord) -> Document {
        let authorities = match &self.resolver {
            Some(resolver) => authority::resolve_authorities(record, resolver.as_ref()).await,
            None => ResolvedAuthorities::default(),
        };

        let ctx = TransformContext::from_record(record, authorities);
        let (doc, report) = apply_rules(record, &ctx);

        debug!(
            bib_id = ctx.bib_id.as_deref().unwrap_or_default(),
            contributed = report.contributed,
            ignored = report.ignored,
            unmatched = report.unmatched,
            "Record mapped"
        );

        doc
    }
}
