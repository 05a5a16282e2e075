//! Table-backed broker on PostgreSQL
//!
//! Deliveries are claimed with `FOR UPDATE SKIP LOCKED` and leased for a
//! fixed time. A delivery whose lease runs out before it is acked becomes
//! visible again, which is how messages of a crashed worker return to the
//! queue.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::debug;

use super::broker::{Broker, Delivery, QueueNames};
use crate::error::Result;

#[derive(Debug, FromRow)]
struct ClaimedRow {
    id: i64,
    payload: String,
    delivery_count: i32,
}

pub struct PgBroker {
    pool: PgPool,
    lease_secs: u64,
}

impl PgBroker {
    pub fn new(pool: PgPool, lease_secs: u64) -> Self {
        Self { pool, lease_secs }
    }
}

#[async_trait]
impl Broker for PgBroker {
    async fn declare(&self, names: &QueueNames) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO harvest_queues (name, exchange, routing_key)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO UPDATE
                SET exchange = EXCLUDED.exchange,
                    routing_key = EXCLUDED.routing_key
            "#,
        )
        .bind(&names.queue)
        .bind(&names.exchange)
        .bind(&names.routing_key)
        .execute(&self.pool)
        .await?;

        debug!(queue = %names.queue, exchange = %names.exchange, "Queue declared");
        Ok(())
    }

    async fn purge(&self, names: &QueueNames) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM harvest_messages WHERE queue_name = $1 AND visible_at <= NOW()",
        )
        .bind(&names.queue)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, names: &QueueNames) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM harvest_messages WHERE queue_name = $1")
            .bind(&names.queue)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM harvest_queues WHERE name = $1")
            .bind(&names.queue)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn publish(&self, names: &QueueNames, payload: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO harvest_messages (queue_name, routing_key, payload)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&names.queue)
        .bind(&names.routing_key)
        .bind(payload)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch(&self, names: &QueueNames) -> Result<Option<Delivery>> {
        let row = sqlx::query_as::<_, ClaimedRow>(
            r#"
            UPDATE harvest_messages
            SET visible_at = NOW() + make_interval(secs => $2),
                delivery_count = delivery_count + 1
            WHERE id = (
                SELECT id FROM harvest_messages
                WHERE queue_name = $1 AND visible_at <= NOW()
                ORDER BY visible_at, id
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, payload, delivery_count
            "#,
        )
        .bind(&names.queue)
        .bind(self.lease_secs as f64)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| Delivery {
            tag: row.id,
            payload: row.payload,
            redelivered: row.delivery_count > 1,
        }))
    }

    async fn ack(&self, names: &QueueNames, tag: i64) -> Result<()> {
        sqlx::query("DELETE FROM harvest_messages WHERE id = $1 AND queue_name = $2")
            .bind(tag)
            .bind(&names.queue)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn reject(&self, names: &QueueNames, tag: i64, requeue: bool) -> Result<()> {
        let query = if requeue {
            "UPDATE harvest_messages SET visible_at = NOW() WHERE id = $1 AND queue_name = $2"
        } else {
            "DELETE FROM harvest_messages WHERE id = $1 AND queue_name = $2"
        };

        sqlx::query(query)
            .bind(tag)
            .bind(&names.queue)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn depth(&self, names: &QueueNames) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM harvest_messages WHERE queue_name = $1 AND visible_at <= NOW()",
        )
        .bind(&names.queue)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }
}
