//! Batched ingestor

use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::link_tables::LinkResolver;
use super::linkage::{
    build_holding, build_item, holdings_type_for, resolve_holding, HoldingKey, HoldingMap,
};
use super::stats::IngestStats;
use super::store::{CommitReport, RecordStore, SearchIndexer};
use crate::catalog::RawCatalogRecord;
use crate::config::IngestConfig;
use crate::error::{HarvestError, Result};
use crate::mapping::FieldMapper;
use crate::models::{Document, EntityKind, Link};

#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Written documents between two commits
    pub bulk_size: usize,
    /// Always create, never look up existing documents
    pub initial_load: bool,
    pub app_base_url: String,
}

impl IngestOptions {
    pub fn from_config(config: &IngestConfig, initial_load: bool) -> Self {
        Self {
            bulk_size: config.bulk_size.max(1),
            initial_load,
            app_base_url: config.app_base_url.clone(),
        }
    }
}

/// What happened to one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Created {
        pid: String,
        holdings: usize,
        items: usize,
        warnings: Vec<String>,
    },
    Replaced {
        pid: String,
    },
    Skipped(String),
    Rejected(String),
}

/// Internal ids written since the last successful flush
#[derive(Debug, Default)]
struct PendingIds {
    documents: Vec<Uuid>,
    holdings: Vec<Uuid>,
    items: Vec<Uuid>,
}

impl PendingIds {
    fn is_empty(&self) -> bool {
        self.documents.is_empty() && self.holdings.is_empty() && self.items.is_empty()
    }

    fn clear(&mut self) {
        self.documents.clear();
        self.holdings.clear();
        self.items.clear();
    }

    fn append(&mut self, other: &mut PendingIds) {
        self.documents.append(&mut other.documents);
        self.holdings.append(&mut other.holdings);
        self.items.append(&mut other.items);
    }

    /// Forget the ids of records the store refused at commit
    fn remove_dropped(&mut self, report: &CommitReport) {
        for ids in [&mut self.documents, &mut self.holdings, &mut self.items] {
            ids.retain(|id| !report.is_dropped(id));
        }
    }
}

/// Turns harvested records into stored documents, holdings and items.
///
/// Every `bulk_size` written documents the pending writes are committed
/// and indexed (holdings, then items, then documents). Each record is one
/// store unit: a record failing halfway leaves nothing behind. A failed
/// commit keeps the pending ids so the next flush retries them.
pub struct Ingestor {
    store: Arc<dyn RecordStore>,
    indexer: Arc<dyn SearchIndexer>,
    mapper: FieldMapper,
    links: LinkResolver,
    options: IngestOptions,
    pending: PendingIds,
    written_since_flush: usize,
    stats: IngestStats,
}

impl Ingestor {
    pub fn new(
        store: Arc<dyn RecordStore>,
        indexer: Arc<dyn SearchIndexer>,
        mapper: FieldMapper,
        options: IngestOptions,
    ) -> Self {
        let links = LinkResolver::new(options.app_base_url.clone());
        Self {
            store,
            indexer,
            mapper,
            links,
            options,
            pending: PendingIds::default(),
            written_since_flush: 0,
            stats: IngestStats::new(),
        }
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    pub fn mapper(&self) -> &FieldMapper {
        &self.mapper
    }

    pub fn links(&self) -> &LinkResolver {
        &self.links
    }

    /// Count an attempt that failed and goes back to the queue for a retry
    pub fn record_failure(&mut self, record_id: &str, error: &HarvestError) {
        self.stats.inc_failed();
        error!(record_id, error = %error, "Error processing record");
    }

    /// Ingest one record.
    ///
    /// Validation failures, pid conflicts and skipped records are
    /// outcomes, not errors; `Err` is kept for store failures worth a
    /// retry.
    pub async fn ingest(&mut self, record: &RawCatalogRecord) -> Result<RecordOutcome> {
        self.store.begin_record().await?;

        let mut written = PendingIds::default();
        match self.ingest_record(record, &mut written).await {
            Ok(outcome) => {
                self.pending.append(&mut written);
                self.flush_if_full().await;
                Ok(outcome)
            }
            Err(e) => {
                self.store.rollback_record().await?;
                if let HarvestError::Conflict(reason) = e {
                    self.stats.inc_rejected();
                    warn!(record_id = %record.id, reason = %reason, "Record rejected");
                    return Ok(RecordOutcome::Rejected(reason));
                }
                self.record_failure(&record.id, &e);
                Err(e)
            }
        }
    }

    /// Ingest a pre-fetched list, then run [`finish`](Self::finish)
    pub async fn ingest_all(&mut self, records: &[RawCatalogRecord]) -> Result<IngestStats> {
        for record in records {
            // per-record failures are counted and logged by `ingest`
            let _ = self.ingest(record).await;
        }
        self.finish().await
    }

    async fn ingest_record(
        &mut self,
        record: &RawCatalogRecord,
        written: &mut PendingIds,
    ) -> Result<RecordOutcome> {
        if record.is_frbr_group {
            self.stats.inc_skipped();
            debug!(record_id = %record.id, "Skipping FRBR group record");
            return Ok(RecordOutcome::Skipped("FRBR group record".to_string()));
        }
        if record.is_masked {
            self.stats.inc_skipped();
            debug!(record_id = %record.id, "Skipping masked record");
            return Ok(RecordOutcome::Skipped("masked record".to_string()));
        }

        let document = self.mapper.map(&record.marc).await;
        if let Err(e) = document.validate() {
            self.stats.inc_rejected();
            warn!(record_id = %record.id, reason = %e, "Record rejected");
            return Ok(RecordOutcome::Rejected(e.to_string()));
        }
        let pid = document.pid.clone().unwrap_or_default();

        if !self.options.initial_load {
            if let Some(existing) = self.store.find_document_by_pid(&pid).await? {
                let stored = self.store.replace_document(existing.id, &document).await?;
                written.documents.push(stored.id);
                self.written_since_flush += 1;
                self.stats.inc_replaced();
                debug!(record_id = %record.id, pid = %stored.pid, "Document replaced");
                return Ok(RecordOutcome::Replaced { pid: stored.pid });
            }
        }

        self.create(record, &document, written).await
    }

    async fn create(
        &mut self,
        record: &RawCatalogRecord,
        document: &Document,
        written: &mut PendingIds,
    ) -> Result<RecordOutcome> {
        let stored = self.store.create_document(document).await?;
        written.documents.push(stored.id);

        let document_link = Link::to_resource(
            self.links.app_base_url(),
            EntityKind::Document.collection(),
            &stored.pid,
        );
        let holdings_type = holdings_type_for(document);
        let mut warnings = Vec::new();

        let mut holding_map = HoldingMap::default();
        for raw in &record.holdings {
            let holding =
                build_holding(raw, &document_link, holdings_type, &self.links, &mut warnings);
            let created = self.store.create_holding(&holding).await?;
            holding_map.insert(HoldingKey::for_holding(raw), created.pid);
            written.holdings.push(created.id);
        }

        for raw in &record.items {
            let holding =
                resolve_holding(raw, &document_link, &holding_map, &self.links, &mut warnings);
            let item = build_item(raw, &document_link, holding, &self.links, &mut warnings);
            let created = self.store.create_item(&item).await?;
            written.items.push(created.id);
        }

        self.written_since_flush += 1;
        self.stats.inc_created();
        self.stats
            .add_linked(record.holdings.len(), record.items.len(), warnings.len());

        debug!(
            record_id = %record.id,
            pid = %stored.pid,
            holdings = record.holdings.len(),
            items = record.items.len(),
            warnings = warnings.len(),
            "Document created"
        );

        Ok(RecordOutcome::Created {
            pid: stored.pid,
            holdings: record.holdings.len(),
            items: record.items.len(),
            warnings,
        })
    }

    async fn flush_if_full(&mut self) {
        if self.written_since_flush < self.options.bulk_size {
            return;
        }
        if let Err(e) = self.flush().await {
            error!(
                error = %e,
                pending = self.written_since_flush,
                "Intermediate commit failed, batch kept for retry"
            );
        }
    }

    /// Commit pending writes, then index what they touched
    pub async fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() && self.written_since_flush == 0 {
            return Ok(());
        }

        let report = self.store.commit().await?;
        self.stats.inc_commits();
        for dropped in &report.dropped {
            self.stats.inc_dropped();
            error!(ids = ?dropped.ids, reason = %dropped.reason, "Record lost at commit");
        }
        self.pending.remove_dropped(&report);
        info!(
            documents = self.pending.documents.len(),
            holdings = self.pending.holdings.len(),
            items = self.pending.items.len(),
            "Batch committed"
        );

        for (kind, ids) in [
            (EntityKind::Holding, &self.pending.holdings),
            (EntityKind::Item, &self.pending.items),
            (EntityKind::Document, &self.pending.documents),
        ] {
            if let Err(e) = self.index(kind, ids).await {
                warn!(kind = %kind, error = %e, "Indexing failed");
            }
        }

        self.pending.clear();
        self.written_since_flush = 0;
        Ok(())
    }

    async fn index(&self, kind: EntityKind, ids: &[Uuid]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.indexer.bulk_index(kind, ids).await?;
        let indexed = self.indexer.process_bulk_queue().await?;
        debug!(kind = %kind, indexed, "Index queue processed");
        Ok(())
    }

    /// Final flush, then identifier-sequence repair for documents and items.
    ///
    /// A failing final commit is returned as an error.
    pub async fn finish(&mut self) -> Result<IngestStats> {
        self.flush().await?;

        for kind in [EntityKind::Document, EntityKind::Item] {
            if let Some(max) = self.store.max_identifier(kind).await? {
                self.store.set_sequence(kind, max).await?;
            }
        }

        self.stats.complete();
        info!(
            created = self.stats.created,
            replaced = self.stats.replaced,
            skipped = self.stats.skipped,
            rejected = self.stats.rejected,
            failed = self.stats.failed,
            dropped = self.stats.dropped,
            warnings = self.stats.warnings,
            commits = self.stats.commits,
            duration_secs = self.stats.duration_secs,
            "Ingestion finished"
        );
        Ok(self.stats.clone())
    }
}
