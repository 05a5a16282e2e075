//! Output entities written to the record store

mod document;
mod holding;

pub use document::{
    ActivityType, Author, AuthorType, Document, DocumentType, EditionStatement,
    ElectronicLocation, Identifier, Language, LocalizedValue, Place, ProvisionActivity, Series,
    Statement, StatementType, UNDETERMINED_LANGUAGE,
};
pub use holding::{EntityKind, Holding, HoldingsType, Item, Link};
