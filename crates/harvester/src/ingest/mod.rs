//! Batched ingestion of harvested records
//!
//! Records are mapped to documents, their holdings and items are linked by
//! composite code keys, and everything is written through a
//! [`RecordStore`] that commits in bounded batches. Each commit is followed
//! by indexing of the written entities.

mod export;
mod ingestor;
mod link_tables;
mod linkage;
mod memory;
mod postgres;
mod stats;
mod store;
mod worker;

pub use export::{export_records, ExportSummary};
pub use ingestor::{IngestOptions, Ingestor, RecordOutcome};
pub use link_tables::{LinkResolver, CODE_TABLE_VERSION, ITEM_TYPES, LOCATIONS};
pub use linkage::{transform_record, HoldingKey, HoldingMap, TransformPreview};
pub use memory::{InMemoryIndexer, InMemoryStore};
pub use postgres::{PgIndexer, PgStore};
pub use stats::IngestStats;
pub use store::{CommitReport, DroppedRecord, RecordStore, SearchIndexer, StoredEntity};
pub use worker::HarvestWorker;
