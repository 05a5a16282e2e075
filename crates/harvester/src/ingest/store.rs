//! Storage and search-index collaborators

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Document, EntityKind, Holding, Item};

/// Internal id and public pid of a written entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntity {
    pub id: Uuid,
    pub pid: String,
}

/// Writes of one record refused while committing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedRecord {
    pub ids: Vec<Uuid>,
    pub reason: String,
}

/// Outcome of a successful commit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Record units rolled back while the rest of the batch was committed
    pub dropped: Vec<DroppedRecord>,
}

impl CommitReport {
    pub fn is_dropped(&self, id: &Uuid) -> bool {
        self.dropped.iter().any(|record| record.ids.contains(id))
    }
}

/// Transactional store for documents, holdings and items.
///
/// Writes stay pending until [`commit`](RecordStore::commit), grouped in
/// record units opened by [`begin_record`](RecordStore::begin_record). A
/// unit is applied or rolled back as a whole, so one failing record never
/// takes the rest of its batch down. A failed commit keeps every pending
/// unit for the next attempt. Entities written without a pid get one from
/// their kind's sequence.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Open a new record unit; later writes belong to it
    async fn begin_record(&self) -> Result<()>;

    /// Discard every write of the open record unit
    async fn rollback_record(&self) -> Result<()>;

    /// Lookup by pid, pending writes included
    async fn find_document_by_pid(&self, pid: &str) -> Result<Option<StoredEntity>>;

    /// Fails with [`HarvestError::Conflict`] when the pid is already taken
    ///
    /// [`HarvestError::Conflict`]: crate::error::HarvestError::Conflict
    async fn create_document(&self, document: &Document) -> Result<StoredEntity>;

    /// Replace the content of an existing document, keeping its id and pid
    async fn replace_document(&self, id: Uuid, document: &Document) -> Result<StoredEntity>;

    async fn create_holding(&self, holding: &Holding) -> Result<StoredEntity>;

    async fn create_item(&self, item: &Item) -> Result<StoredEntity>;

    /// Make every pending record unit durable in one transaction
    async fn commit(&self) -> Result<CommitReport>;

    /// Every committed entity of `kind` as stored, ordered by pid
    async fn all_entities(&self, kind: EntityKind) -> Result<Vec<serde_json::Value>>;

    /// Largest numeric pid persisted for `kind`
    async fn max_identifier(&self, kind: EntityKind) -> Result<Option<i64>>;

    /// Fast-forward the pid sequence of `kind` so its next value follows `value`
    async fn set_sequence(&self, kind: EntityKind, value: i64) -> Result<()>;
}

#[async_trait]
pub trait SearchIndexer: Send + Sync {
    /// Queue entities for indexing
    async fn bulk_index(&self, kind: EntityKind, ids: &[Uuid]) -> Result<()>;

    /// Index everything queued, returning how many entities were indexed
    async fn process_bulk_queue(&self) -> Result<usize>;
}
