//! MARC21 record model
//!
//! Records keep their fields and subfields in source order. Every accessor
//! is tolerant: a missing tag, subfield or fixed position yields `None`
//! rather than an error.

mod linkage;
mod record;
mod xml;

pub use linkage::{AlternateGraphic, AlternateGraphicIndex, FieldLink};
pub use record::{ControlField, DataField, Field, FixedData, MarcRecord, Subfield};
