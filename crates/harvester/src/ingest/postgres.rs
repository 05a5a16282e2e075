//! PostgreSQL store and outbox indexer
//!
//! Entities are kept as JSONB documents next to their pid. Writes are
//! buffered per record unit and applied in one short transaction on
//! commit, each unit under its own savepoint. No transaction stays open
//! between two commits.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{Acquire, PgConnection, PgPool};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::store::{CommitReport, DroppedRecord, RecordStore, SearchIndexer, StoredEntity};
use crate::error::{HarvestError, Result};
use crate::models::{Document, EntityKind, Holding, Item};

fn table_name(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Document => "documents",
        EntityKind::Holding => "holdings",
        EntityKind::Item => "items",
    }
}

fn with_pid<T: Serialize>(entity: &T, pid: &str) -> Result<serde_json::Value> {
    let mut body = serde_json::to_value(entity)?;
    if let serde_json::Value::Object(map) = &mut body {
        map.insert("pid".to_string(), serde_json::Value::String(pid.to_string()));
    }
    Ok(body)
}

#[derive(Debug, Clone)]
enum PendingWrite {
    Insert {
        kind: EntityKind,
        id: Uuid,
        pid: String,
        data: serde_json::Value,
    },
    Update {
        id: Uuid,
        data: serde_json::Value,
    },
}

impl PendingWrite {
    fn id(&self) -> Uuid {
        match self {
            PendingWrite::Insert { id, .. } | PendingWrite::Update { id, .. } => *id,
        }
    }
}

/// Buffered writes of one record
#[derive(Debug, Clone, Default)]
struct RecordUnit {
    writes: Vec<PendingWrite>,
}

impl RecordUnit {
    fn ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.writes.iter().map(PendingWrite::id).collect();
        ids.dedup();
        ids
    }
}

fn pending_document(units: &[RecordUnit], pid: &str) -> Option<StoredEntity> {
    units
        .iter()
        .rev()
        .flat_map(|unit| unit.writes.iter().rev())
        .find_map(|write| match write {
            PendingWrite::Insert {
                kind: EntityKind::Document,
                id,
                pid: pending_pid,
                ..
            } if pending_pid == pid => Some(StoredEntity {
                id: *id,
                pid: pending_pid.clone(),
            }),
            _ => None,
        })
}

fn pending_pid_of(units: &[RecordUnit], document_id: Uuid) -> Option<String> {
    units
        .iter()
        .flat_map(|unit| unit.writes.iter())
        .find_map(|write| match write {
            PendingWrite::Insert {
                kind: EntityKind::Document,
                id,
                pid,
                ..
            } if *id == document_id => Some(pid.clone()),
            _ => None,
        })
}

async fn apply_unit(conn: &mut PgConnection, unit: &RecordUnit) -> Result<()> {
    for write in &unit.writes {
        match write {
            PendingWrite::Insert {
                kind,
                id,
                pid,
                data,
            } => {
                let sql = format!(
                    "INSERT INTO {} (id, pid, data) VALUES ($1, $2, $3)",
                    table_name(*kind)
                );
                sqlx::query(&sql)
                    .bind(id)
                    .bind(pid)
                    .bind(data)
                    .execute(&mut *conn)
                    .await?;
            }
            PendingWrite::Update { id, data } => {
                let result = sqlx::query(
                    "UPDATE documents SET data = $2, updated_at = NOW() WHERE id = $1",
                )
                .bind(id)
                .bind(data)
                .execute(&mut *conn)
                .await?;
                if result.rows_affected() == 0 {
                    return Err(HarvestError::Validation(format!("no document with id {id}")));
                }
            }
        }
    }
    Ok(())
}

pub struct PgStore {
    pool: PgPool,
    pending: Mutex<Vec<RecordUnit>>,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Apply the bundled schema migrations
    pub async fn run_migrations(pool: &PgPool) -> Result<()> {
        sqlx::migrate!("./migrations").run(pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Buffered writes not yet committed
    pub async fn pending_count(&self) -> usize {
        self.pending
            .lock()
            .await
            .iter()
            .map(|unit| unit.writes.len())
            .sum()
    }

    async fn next_pid(&self, kind: EntityKind) -> Result<String> {
        let value: i64 = sqlx::query_scalar("SELECT nextval($1::regclass)")
            .bind(kind.sequence_name())
            .fetch_one(&self.pool)
            .await?;
        Ok(value.to_string())
    }

    async fn push(&self, write: PendingWrite) {
        let mut units = self.pending.lock().await;
        if units.is_empty() {
            units.push(RecordUnit::default());
        }
        if let Some(unit) = units.last_mut() {
            unit.writes.push(write);
        }
    }

    async fn insert(
        &self,
        kind: EntityKind,
        pid: String,
        data: serde_json::Value,
    ) -> StoredEntity {
        let id = Uuid::new_v4();
        self.push(PendingWrite::Insert {
            kind,
            id,
            pid: pid.clone(),
            data,
        })
        .await;
        StoredEntity { id, pid }
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn begin_record(&self) -> Result<()> {
        let mut units = self.pending.lock().await;
        if units.last().map_or(true, |unit| !unit.writes.is_empty()) {
            units.push(RecordUnit::default());
        }
        Ok(())
    }

    async fn rollback_record(&self) -> Result<()> {
        if let Some(unit) = self.pending.lock().await.pop() {
            debug!(writes = unit.writes.len(), "Record writes discarded");
        }
        Ok(())
    }

    async fn find_document_by_pid(&self, pid: &str) -> Result<Option<StoredEntity>> {
        let pending = pending_document(&self.pending.lock().await, pid);
        if pending.is_some() {
            return Ok(pending);
        }

        let row =
            sqlx::query_as::<_, (Uuid, String)>("SELECT id, pid FROM documents WHERE pid = $1")
                .bind(pid)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id, pid)| StoredEntity { id, pid }))
    }

    async fn create_document(&self, document: &Document) -> Result<StoredEntity> {
        let pid = match &document.pid {
            Some(pid) => pid.clone(),
            None => self.next_pid(EntityKind::Document).await?,
        };
        if let Some(existing) = self.find_document_by_pid(&pid).await? {
            return Err(HarvestError::Conflict(format!(
                "document {} already exists",
                existing.pid
            )));
        }

        let data = with_pid(document, &pid)?;
        Ok(self.insert(EntityKind::Document, pid, data).await)
    }

    async fn replace_document(&self, id: Uuid, document: &Document) -> Result<StoredEntity> {
        let pending = pending_pid_of(&self.pending.lock().await, id);
        let pid = match pending {
            Some(pid) => Some(pid),
            None => {
                sqlx::query_scalar::<_, String>("SELECT pid FROM documents WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };
        let pid = pid.ok_or_else(|| HarvestError::Validation(format!("no document with id {id}")))?;

        let data = with_pid(document, &pid)?;
        self.push(PendingWrite::Update { id, data }).await;
        Ok(StoredEntity { id, pid })
    }

    async fn create_holding(&self, holding: &Holding) -> Result<StoredEntity> {
        let pid = self.next_pid(EntityKind::Holding).await?;
        let data = with_pid(holding, &pid)?;
        Ok(self.insert(EntityKind::Holding, pid, data).await)
    }

    async fn create_item(&self, item: &Item) -> Result<StoredEntity> {
        let pid = self.next_pid(EntityKind::Item).await?;
        let data = with_pid(item, &pid)?;
        Ok(self.insert(EntityKind::Item, pid, data).await)
    }

    async fn commit(&self) -> Result<CommitReport> {
        let mut units = self.pending.lock().await;
        units.retain(|unit| !unit.writes.is_empty());
        if units.is_empty() {
            debug!("Nothing to commit");
            return Ok(CommitReport::default());
        }

        let mut tx = self.pool.begin().await?;
        let mut report = CommitReport::default();

        for unit in units.iter() {
            let mut savepoint = tx.begin().await?;
            match apply_unit(&mut savepoint, unit).await {
                Ok(()) => savepoint.commit().await?,
                Err(e) => {
                    savepoint.rollback().await?;
                    let ids = unit.ids();
                    warn!(ids = ?ids, error = %e, "Record rolled back at commit");
                    report.dropped.push(DroppedRecord {
                        ids,
                        reason: e.to_string(),
                    });
                }
            }
        }

        // an aborted transaction answers COMMIT with a silent ROLLBACK
        sqlx::query("SELECT 1")
            .execute(&mut *tx)
            .await
            .map_err(|e| HarvestError::Commit(e.to_string()))?;
        tx.commit()
            .await
            .map_err(|e| HarvestError::Commit(e.to_string()))?;

        let records = units.len() - report.dropped.len();
        units.clear();
        debug!(records, dropped = report.dropped.len(), "Transaction committed");
        Ok(report)
    }

    async fn all_entities(&self, kind: EntityKind) -> Result<Vec<serde_json::Value>> {
        let sql = format!(
            "SELECT data FROM {} ORDER BY length(pid), pid",
            table_name(kind)
        );
        let rows: Vec<serde_json::Value> = sqlx::query_scalar(&sql).fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn max_identifier(&self, kind: EntityKind) -> Result<Option<i64>> {
        let sql = format!(
            "SELECT MAX(pid::BIGINT) FROM {} WHERE pid ~ '^[0-9]+$'",
            table_name(kind)
        );
        let max: Option<i64> = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(max)
    }

    async fn set_sequence(&self, kind: EntityKind, value: i64) -> Result<()> {
        sqlx::query("SELECT setval($1::regclass, $2)")
            .bind(kind.sequence_name())
            .bind(value.max(1))
            .execute(&self.pool)
            .await?;
        info!(kind = %kind, value, "Identifier sequence repaired");
        Ok(())
    }
}

/// Indexer writing to an outbox table drained into the search index table
pub struct PgIndexer {
    pool: PgPool,
}

impl PgIndexer {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SearchIndexer for PgIndexer {
    async fn bulk_index(&self, kind: EntityKind, ids: &[Uuid]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        sqlx::query(
            r#"
            INSERT INTO index_queue (entity_kind, entity_id)
            SELECT $1, UNNEST($2::UUID[])
            "#,
        )
        .bind(kind.as_str())
        .bind(ids)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn process_bulk_queue(&self) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        let claimed: Vec<(i64, String, Uuid)> = sqlx::query_as(
            r#"
            DELETE FROM index_queue
            WHERE id IN (
                SELECT id FROM index_queue ORDER BY id FOR UPDATE SKIP LOCKED
            )
            RETURNING id, entity_kind, entity_id
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        for kind in [EntityKind::Holding, EntityKind::Item, EntityKind::Document] {
            let ids: Vec<Uuid> = claimed
                .iter()
                .filter(|(_, k, _)| k == kind.as_str())
                .map(|(_, _, id)| *id)
                .collect();
            if ids.is_empty() {
                continue;
            }

            let sql = format!(
                r#"
                INSERT INTO search_index (entity_kind, entity_id, pid, body, indexed_at)
                SELECT $1, id, pid, data, NOW() FROM {} WHERE id = ANY($2)
                ON CONFLICT (entity_kind, entity_id) DO UPDATE
                    SET pid = EXCLUDED.pid, body = EXCLUDED.body, indexed_at = NOW()
                "#,
                table_name(kind)
            );
            sqlx::query(&sql)
                .bind(kind.as_str())
                .bind(&ids)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(claimed.len())
    }
}
