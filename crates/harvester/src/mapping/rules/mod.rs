//! Rule functions referenced by the mapping table

pub mod authors;
pub mod control;
pub mod description;
pub mod identifiers;
pub mod leader;
pub mod notes;
pub mod provision;
pub mod titles;
