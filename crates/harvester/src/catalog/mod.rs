//! Access to the legacy catalog REST API
//!
//! [`RecordFetcher`] walks the paginated listing endpoint and hands record
//! identifiers to the queue; [`SourceRecordLoader`] fetches one record and
//! exposes its MARC payload, holdings and items.

mod client;
mod fetcher;
mod loader;
mod record;

pub use client::{record_uri, CatalogClient, RECORD_ROUTE};
pub use fetcher::{extract_record_ids, ListingPage, RecordFetcher, LISTING_ROUTE};
pub use loader::SourceRecordLoader;
pub use record::{CatalogCode, RawCatalogRecord, RawHolding, RawItem};
