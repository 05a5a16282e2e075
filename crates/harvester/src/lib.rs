//! Catalog Harvester
//!
//! Synchronises bibliographic records from a legacy library catalog REST API
//! into the local document, holding and item store.
//!
//! The pipeline, leaves first:
//!
//! - [`mapping`]: MARC21 field-mapping engine (static rule table)
//! - [`catalog`]: paginated record fetcher and source record loader
//! - [`queue`]: queue gateway over a broker with ack/reject semantics
//! - [`ingest`]: batched ingestor with holding/item linkage and sequence repair

pub mod catalog;
pub mod config;
pub mod error;
pub mod ingest;
pub mod mapping;
pub mod marc;
pub mod models;
pub mod queue;

pub use config::HarvesterConfig;
pub use error::{HarvestError, Result};
