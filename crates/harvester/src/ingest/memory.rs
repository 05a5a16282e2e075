//! In-memory store and indexer for tests and dry runs

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::store::{CommitReport, DroppedRecord, RecordStore, SearchIndexer, StoredEntity};
use crate::error::{HarvestError, Result};
use crate::models::{Document, EntityKind, Holding, Item};

#[derive(Debug, Clone)]
struct Entry {
    kind: EntityKind,
    pid: String,
    body: Value,
}

type RecordUnit = Vec<(Uuid, Entry)>;

#[derive(Debug, Default)]
struct State {
    committed: HashMap<Uuid, Entry>,
    /// Record units written since the last commit, applied in order
    pending: Vec<RecordUnit>,
    sequences: HashMap<EntityKind, i64>,
    commits: usize,
    fail_next_commit: bool,
    /// Entity writes left before one fails
    fail_write_after: Option<usize>,
    /// Document pids whose record unit the next commit refuses
    refused: HashSet<String>,
}

impl State {
    fn pending_entries(&self) -> impl DoubleEndedIterator<Item = &(Uuid, Entry)> {
        self.pending.iter().flatten()
    }

    fn latest(&self, id: &Uuid) -> Option<&Entry> {
        self.pending_entries()
            .rev()
            .find(|(pending_id, _)| pending_id == id)
            .map(|(_, entry)| entry)
            .or_else(|| self.committed.get(id))
    }

    fn find_document(&self, pid: &str) -> Option<StoredEntity> {
        self.pending_entries()
            .rev()
            .map(|(id, e)| (id, e))
            .chain(self.committed.iter())
            .find(|(_, e)| e.kind == EntityKind::Document && e.pid == pid)
            .map(|(id, e)| StoredEntity {
                id: *id,
                pid: e.pid.clone(),
            })
    }

    fn check_write(&mut self) -> Result<()> {
        match self.fail_write_after {
            Some(0) => {
                self.fail_write_after = None;
                Err(HarvestError::Database(sqlx::Error::PoolTimedOut))
            }
            Some(n) => {
                self.fail_write_after = Some(n - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn next_pid(&mut self, kind: EntityKind) -> String {
        let sequence = self.sequences.entry(kind).or_insert(0);
        *sequence += 1;
        sequence.to_string()
    }

    fn write(&mut self, id: Uuid, kind: EntityKind, pid: String, mut body: Value) -> StoredEntity {
        if let Value::Object(map) = &mut body {
            map.insert("pid".to_string(), Value::String(pid.clone()));
        }
        if self.pending.is_empty() {
            self.pending.push(Vec::new());
        }
        if let Some(unit) = self.pending.last_mut() {
            unit.push((id, Entry { kind, pid: pid.clone(), body }));
        }
        StoredEntity { id, pid }
    }

    fn is_refused(&self, unit: &RecordUnit) -> bool {
        unit.iter()
            .any(|(_, e)| e.kind == EntityKind::Document && self.refused.contains(&e.pid))
    }

    fn committed_of(&self, kind: EntityKind) -> Vec<&Entry> {
        let mut entries: Vec<&Entry> = self.committed.values().filter(|e| e.kind == kind).collect();
        entries.sort_by_key(|e| (e.pid.parse::<i64>().unwrap_or(i64::MAX), e.pid.clone()));
        entries
    }

    fn committed_as<T: serde::de::DeserializeOwned>(&self, kind: EntityKind) -> Vec<T> {
        self.committed_of(kind)
            .into_iter()
            .filter_map(|e| serde_json::from_value(e.body.clone()).ok())
            .collect()
    }
}

/// Store kept in memory, with the same record-unit and commit semantics
/// as the database store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next commit fail, leaving pending writes in place
    pub async fn fail_next_commit(&self) {
        self.state.lock().await.fail_next_commit = true;
    }

    /// Let `successful` entity writes through, then fail the next one
    pub async fn fail_write_after(&self, successful: usize) {
        self.state.lock().await.fail_write_after = Some(successful);
    }

    /// Make the next commit roll back the record unit that wrote document `pid`
    pub async fn refuse_on_commit(&self, pid: impl Into<String>) {
        self.state.lock().await.refused.insert(pid.into());
    }

    pub async fn commit_count(&self) -> usize {
        self.state.lock().await.commits
    }

    /// Pending writes across all record units
    pub async fn pending_count(&self) -> usize {
        self.state.lock().await.pending.iter().map(Vec::len).sum()
    }

    /// Current value of a pid sequence
    pub async fn sequence(&self, kind: EntityKind) -> i64 {
        self.state
            .lock()
            .await
            .sequences
            .get(&kind)
            .copied()
            .unwrap_or(0)
    }

    pub async fn documents(&self) -> Vec<Document> {
        self.state.lock().await.committed_as(EntityKind::Document)
    }

    pub async fn holdings(&self) -> Vec<Holding> {
        self.state.lock().await.committed_as(EntityKind::Holding)
    }

    pub async fn items(&self) -> Vec<Item> {
        self.state.lock().await.committed_as(EntityKind::Item)
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn begin_record(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.pending.last().map_or(true, |unit| !unit.is_empty()) {
            state.pending.push(Vec::new());
        }
        Ok(())
    }

    async fn rollback_record(&self) -> Result<()> {
        self.state.lock().await.pending.pop();
        Ok(())
    }

    async fn find_document_by_pid(&self, pid: &str) -> Result<Option<StoredEntity>> {
        Ok(self.state.lock().await.find_document(pid))
    }

    async fn create_document(&self, document: &Document) -> Result<StoredEntity> {
        let mut state = self.state.lock().await;
        state.check_write()?;
        let pid = match document.pid.clone() {
            Some(pid) => pid,
            None => state.next_pid(EntityKind::Document),
        };
        if state.find_document(&pid).is_some() {
            return Err(HarvestError::Conflict(format!("document {pid} already exists")));
        }
        let body = serde_json::to_value(document)?;
        Ok(state.write(Uuid::new_v4(), EntityKind::Document, pid, body))
    }

    async fn replace_document(&self, id: Uuid, document: &Document) -> Result<StoredEntity> {
        let mut state = self.state.lock().await;
        let pid = state
            .latest(&id)
            .filter(|e| e.kind == EntityKind::Document)
            .map(|e| e.pid.clone())
            .ok_or_else(|| HarvestError::Validation(format!("no document with id {id}")))?;
        let body = serde_json::to_value(document)?;
        Ok(state.write(id, EntityKind::Document, pid, body))
    }

    async fn create_holding(&self, holding: &Holding) -> Result<StoredEntity> {
        let mut state = self.state.lock().await;
        state.check_write()?;
        let pid = state.next_pid(EntityKind::Holding);
        let body = serde_json::to_value(holding)?;
        Ok(state.write(Uuid::new_v4(), EntityKind::Holding, pid, body))
    }

    async fn create_item(&self, item: &Item) -> Result<StoredEntity> {
        let mut state = self.state.lock().await;
        state.check_write()?;
        let pid = state.next_pid(EntityKind::Item);
        let body = serde_json::to_value(item)?;
        Ok(state.write(Uuid::new_v4(), EntityKind::Item, pid, body))
    }

    async fn commit(&self) -> Result<CommitReport> {
        let mut state = self.state.lock().await;
        if state.fail_next_commit {
            state.fail_next_commit = false;
            return Err(HarvestError::Commit("simulated commit failure".to_string()));
        }

        let mut report = CommitReport::default();
        let units = std::mem::take(&mut state.pending);
        for unit in units.into_iter().filter(|unit| !unit.is_empty()) {
            if state.is_refused(&unit) {
                report.dropped.push(DroppedRecord {
                    ids: unit.iter().map(|(id, _)| *id).collect(),
                    reason: "refused by the store".to_string(),
                });
                continue;
            }
            for (id, entry) in unit {
                state.committed.insert(id, entry);
            }
        }
        state.refused.clear();
        state.commits += 1;
        Ok(report)
    }

    async fn all_entities(&self, kind: EntityKind) -> Result<Vec<Value>> {
        let state = self.state.lock().await;
        Ok(state
            .committed_of(kind)
            .into_iter()
            .map(|e| e.body.clone())
            .collect())
    }

    async fn max_identifier(&self, kind: EntityKind) -> Result<Option<i64>> {
        let state = self.state.lock().await;
        Ok(state
            .committed
            .values()
            .filter(|e| e.kind == kind)
            .filter_map(|e| e.pid.parse::<i64>().ok())
            .max())
    }

    async fn set_sequence(&self, kind: EntityKind, value: i64) -> Result<()> {
        self.state.lock().await.sequences.insert(kind, value);
        Ok(())
    }
}

/// Indexer recording what was indexed
#[derive(Debug, Default)]
pub struct InMemoryIndexer {
    queue: Mutex<Vec<(EntityKind, Uuid)>>,
    indexed: Mutex<Vec<(EntityKind, Uuid)>>,
}

impl InMemoryIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexed entities in indexing order
    pub async fn indexed(&self) -> Vec<(EntityKind, Uuid)> {
        self.indexed.lock().await.clone()
    }
}

#[async_trait]
impl SearchIndexer for InMemoryIndexer {
    async fn bulk_index(&self, kind: EntityKind, ids: &[Uuid]) -> Result<()> {
        self.queue
            .lock()
            .await
            .extend(ids.iter().map(|id| (kind, *id)));
        Ok(())
    }

    async fn process_bulk_queue(&self) -> Result<usize> {
        let drained = std::mem::take(&mut *self.queue.lock().await);
        let count = drained.len();
        self.indexed.lock().await.extend(drained);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentType, Language};

    fn document(pid: &str, title: &str) -> Document {
        Document {
            pid: Some(pid.to_string()),
            document_type: Some(DocumentType::Book),
            title: Some(title.to_string()),
            language: vec![Language::new("fre")],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_writes_visible_after_commit_only() {
        let store = InMemoryStore::new();
        store.create_document(&document("10", "A")).await.unwrap();

        assert!(store.documents().await.is_empty());
        assert!(store.find_document_by_pid("10").await.unwrap().is_some());

        store.commit().await.unwrap();
        assert_eq!(store.documents().await.len(), 1);
        assert_eq!(store.commit_count().await, 1);
    }

    #[tokio::test]
    async fn test_replace_keeps_identity() {
        let store = InMemoryStore::new();
        let created = store.create_document(&document("10", "A")).await.unwrap();
        store.commit().await.unwrap();

        let replaced = store
            .replace_document(created.id, &document("10", "B"))
            .await
            .unwrap();
        store.commit().await.unwrap();

        assert_eq!(replaced, created);
        let docs = store.documents().await;
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title.as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn test_failed_commit_keeps_pending() {
        let store = InMemoryStore::new();
        store.create_document(&document("10", "A")).await.unwrap();
        store.fail_next_commit().await;

        assert!(matches!(store.commit().await, Err(HarvestError::Commit(_))));
        assert_eq!(store.pending_count().await, 1);

        store.commit().await.unwrap();
        assert_eq!(store.pending_count().await, 0);
        assert_eq!(store.commit_count().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_document_pid_conflicts() {
        let store = InMemoryStore::new();
        store.create_document(&document("10", "A")).await.unwrap();

        let pending = store.create_document(&document("10", "B")).await;
        assert!(matches!(pending, Err(HarvestError::Conflict(_))));

        store.commit().await.unwrap();
        let committed = store.create_document(&document("10", "C")).await;
        assert!(matches!(committed, Err(HarvestError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_rollback_discards_only_the_open_record() {
        let store = InMemoryStore::new();
        store.begin_record().await.unwrap();
        store.create_document(&document("1", "A")).await.unwrap();
        store.begin_record().await.unwrap();
        store.create_document(&document("2", "B")).await.unwrap();
        store.rollback_record().await.unwrap();

        assert_eq!(store.pending_count().await, 1);
        store.commit().await.unwrap();
        let docs = store.documents().await;
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].pid.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_refused_record_is_reported_and_rest_committed() {
        let store = InMemoryStore::new();
        store.begin_record().await.unwrap();
        store.create_document(&document("1", "A")).await.unwrap();
        store.begin_record().await.unwrap();
        let refused = store.create_document(&document("2", "B")).await.unwrap();
        store.refuse_on_commit("2").await;

        let report = store.commit().await.unwrap();

        assert_eq!(report.dropped.len(), 1);
        assert!(report.is_dropped(&refused.id));
        assert_eq!(store.documents().await.len(), 1);
        assert_eq!(store.all_entities(EntityKind::Document).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_max_identifier_and_sequence() {
        let store = InMemoryStore::new();
        store.create_document(&document("7", "A")).await.unwrap();
        store.create_document(&document("12", "B")).await.unwrap();
        store.commit().await.unwrap();

        assert_eq!(store.sequence(EntityKind::Document).await, 0);
        let max = store.max_identifier(EntityKind::Document).await.unwrap();
        assert_eq!(max, Some(12));

        store.set_sequence(EntityKind::Document, 12).await.unwrap();
        assert_eq!(store.sequence(EntityKind::Document).await, 12);
    }

    #[tokio::test]
    async fn test_indexer_drains_queue() {
        let indexer = InMemoryIndexer::new();
        let ids = [Uuid::new_v4(), Uuid::new_v4()];
        indexer.bulk_index(EntityKind::Item, &ids).await.unwrap();

        assert_eq!(indexer.process_bulk_queue().await.unwrap(), 2);
        assert_eq!(indexer.process_bulk_queue().await.unwrap(), 0);
        assert_eq!(indexer.indexed().await.len(), 2);
    }
}
