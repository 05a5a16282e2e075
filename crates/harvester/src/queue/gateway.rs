//! Queue gateway: producer and consumer sides of the harvest queue

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::broker::{Broker, QueueNames};
use super::message::{HarvestMessage, HarvestOp};
use crate::catalog::record_uri;
use crate::error::Result;

/// Processes one consumed message.
///
/// `Ok` acknowledges the delivery; `Err` rejects it back onto the queue.
#[async_trait]
pub trait MessageHandler: Send {
    async fn handle(&mut self, message: HarvestMessage) -> Result<()>;
}

/// Outcome counts of one [`QueueGateway::consume`] pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumeSummary {
    pub acked: u64,
    pub rejected: u64,
    /// Undecodable payloads dropped without requeue
    pub discarded: u64,
}

impl ConsumeSummary {
    pub fn total(&self) -> u64 {
        self.acked + self.rejected + self.discarded
    }
}

#[derive(Clone)]
pub struct QueueGateway {
    broker: Arc<dyn Broker>,
    names: QueueNames,
    catalog_base_url: String,
}

impl QueueGateway {
    pub fn new(broker: Arc<dyn Broker>, names: QueueNames, catalog_base_url: impl Into<String>) -> Self {
        Self {
            broker,
            names,
            catalog_base_url: catalog_base_url.into(),
        }
    }

    pub fn names(&self) -> &QueueNames {
        &self.names
    }

    /// Publish one message; the record URI defaults to the catalog record endpoint
    pub async fn enqueue(&self, op: HarvestOp, id: &str, uri: Option<&str>) -> Result<()> {
        let id = id.trim();
        let uri = match uri {
            Some(uri) => uri.to_string(),
            None => record_uri(&self.catalog_base_url, id),
        };
        let message = HarvestMessage::new(op, id, uri);
        self.broker.publish(&self.names, &message.to_json()?).await?;

        debug!(record_id = id, op = %op, "Record queued");
        Ok(())
    }

    /// Publish with an operation name taken from outside the crate.
    ///
    /// Unknown names fail before anything reaches the broker.
    pub async fn publish_raw(&self, op: &str, id: &str, uri: Option<&str>) -> Result<()> {
        let op: HarvestOp = op.parse()?;
        self.enqueue(op, id, uri).await
    }

    /// Queue `harvest` work for every non-blank identifier
    pub async fn bulk_to_harvest(&self, ids: &[String]) -> Result<usize> {
        let mut count = 0;
        for id in ids.iter().map(|id| id.trim()).filter(|id| !id.is_empty()) {
            self.enqueue(HarvestOp::Harvest, id, None).await?;
            count += 1;
        }
        Ok(count)
    }

    /// Drain the messages queued when the pass starts.
    ///
    /// Each message is handed to `handler`; deliveries are acked on success
    /// and requeued on failure. Requeued messages are left for a later pass.
    pub async fn consume<H>(&self, handler: &mut H) -> Result<ConsumeSummary>
    where
        H: MessageHandler + ?Sized,
    {
        let snapshot = self.broker.depth(&self.names).await?;
        let mut summary = ConsumeSummary::default();

        info!(queue = %self.names.queue, pending = snapshot, "Consuming harvest queue");

        while summary.total() < snapshot {
            let Some(delivery) = self.broker.fetch(&self.names).await? else {
                break;
            };

            let message = match HarvestMessage::from_json(&delivery.payload) {
                Ok(message) => message,
                Err(e) => {
                    warn!(tag = delivery.tag, error = %e, "Discarding undecodable message");
                    self.broker.reject(&self.names, delivery.tag, false).await?;
                    summary.discarded += 1;
                    continue;
                }
            };

            let record_id = message.id.clone();
            match handler.handle(message).await {
                Ok(()) => {
                    self.broker.ack(&self.names, delivery.tag).await?;
                    summary.acked += 1;
                }
                Err(e) => {
                    error!(
                        record_id = %record_id,
                        redelivered = delivery.redelivered,
                        error = %e,
                        "Failed to harvest record {}",
                        record_id
                    );
                    self.broker.reject(&self.names, delivery.tag, true).await?;
                    summary.rejected += 1;
                }
            }
        }

        info!(
            acked = summary.acked,
            rejected = summary.rejected,
            discarded = summary.discarded,
            "Harvest queue pass complete"
        );
        Ok(summary)
    }

    pub async fn init(&self) -> Result<()> {
        self.broker.declare(&self.names).await?;
        info!(queue = %self.names.queue, "Harvest queue initialized");
        Ok(())
    }

    pub async fn purge(&self) -> Result<u64> {
        let removed = self.broker.purge(&self.names).await?;
        info!(queue = %self.names.queue, removed, "Harvest queue purged");
        Ok(removed)
    }

    pub async fn delete(&self) -> Result<()> {
        self.broker.delete(&self.names).await?;
        info!(queue = %self.names.queue, "Harvest queue deleted");
        Ok(())
    }

    pub async fn depth(&self) -> Result<u64> {
        self.broker.depth(&self.names).await
    }
}
