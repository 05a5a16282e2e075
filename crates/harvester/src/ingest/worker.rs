//! Queue consumer tying loader, mapping engine and ingestor together

use async_trait::async_trait;
use tracing::{info, warn};

use super::ingestor::{Ingestor, RecordOutcome};
use super::stats::IngestStats;
use crate::catalog::SourceRecordLoader;
use crate::error::Result;
use crate::queue::{HarvestMessage, HarvestOp, MessageHandler, QueueGateway};

pub struct HarvestWorker {
    loader: SourceRecordLoader,
    ingestor: Ingestor,
}

impl HarvestWorker {
    pub fn new(loader: SourceRecordLoader, ingestor: Ingestor) -> Self {
        Self { loader, ingestor }
    }

    pub fn ingestor(&self) -> &Ingestor {
        &self.ingestor
    }

    /// Drain the queue once, then finish the ingestion run
    pub async fn run(&mut self, gateway: &QueueGateway) -> Result<IngestStats> {
        let summary = gateway.consume(self).await?;
        info!(
            acked = summary.acked,
            rejected = summary.rejected,
            discarded = summary.discarded,
            "Queue drained"
        );
        self.ingestor.finish().await
    }
}

#[async_trait]
impl MessageHandler for HarvestWorker {
    async fn handle(&mut self, message: HarvestMessage) -> Result<()> {
        if message.op == HarvestOp::Delete {
            warn!(record_id = %message.id, "Delete requested, record left in place");
            return Ok(());
        }

        let record = match self.loader.load(&message.id, &message.uri).await {
            Ok(record) => record,
            Err(e) => {
                self.ingestor.record_failure(&message.id, &e);
                return Err(e);
            }
        };

        match self.ingestor.ingest(&record).await? {
            RecordOutcome::Created { pid, warnings, .. } if !warnings.is_empty() => {
                warn!(record_id = %message.id, pid = %pid, warnings = ?warnings, "Record created with linkage warnings");
            }
            RecordOutcome::Rejected(reason) => {
                info!(record_id = %message.id, reason = %reason, "Record rejected, message acknowledged");
            }
            _ => {}
        }
        Ok(())
    }
}
