//! Broker abstraction

use async_trait::async_trait;

use crate::config::QueueConfig;
use crate::error::Result;

/// Exchange/queue/routing-key triple the gateway works on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueNames {
    pub exchange: String,
    pub queue: String,
    pub routing_key: String,
}

impl From<&QueueConfig> for QueueNames {
    fn from(config: &QueueConfig) -> Self {
        Self {
            exchange: config.exchange.clone(),
            queue: config.queue.clone(),
            routing_key: config.routing_key.clone(),
        }
    }
}

/// A message handed out by [`Broker::fetch`], pending ack or reject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub tag: i64,
    pub payload: String,
    pub redelivered: bool,
}

/// Message broker with per-delivery acknowledgement.
///
/// A fetched delivery stays invisible to other consumers until it is
/// acked, rejected, or its lease runs out.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Declare the exchange and queue; idempotent
    async fn declare(&self, names: &QueueNames) -> Result<()>;

    /// Drop pending messages, returning how many were removed
    async fn purge(&self, names: &QueueNames) -> Result<u64>;

    /// Remove the queue and exchange; idempotent
    async fn delete(&self, names: &QueueNames) -> Result<()>;

    async fn publish(&self, names: &QueueNames, payload: &str) -> Result<()>;

    /// Next ready delivery, `None` when the queue is drained
    async fn fetch(&self, names: &QueueNames) -> Result<Option<Delivery>>;

    async fn ack(&self, names: &QueueNames, tag: i64) -> Result<()>;

    async fn reject(&self, names: &QueueNames, tag: i64, requeue: bool) -> Result<()>;

    /// Messages ready for delivery
    async fn depth(&self, names: &QueueNames) -> Result<u64>;
}
