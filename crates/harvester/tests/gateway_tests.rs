//! Integration tests for the queue gateway over the in-memory broker

use async_trait::async_trait;
use harvester::queue::{
    Broker, HarvestMessage, HarvestOp, InMemoryBroker, MessageHandler, QueueGateway, QueueNames,
};
use harvester::{HarvestError, Result};
use std::sync::Arc;

const CATALOG_URL: &str = "http://catalog.example.org/rest";

fn names() -> QueueNames {
    QueueNames {
        exchange: "harvest".to_string(),
        queue: "harvest".to_string(),
        routing_key: "harvest".to_string(),
    }
}

fn gateway() -> (Arc<InMemoryBroker>, QueueGateway) {
    let broker = Arc::new(InMemoryBroker::new());
    let gateway = QueueGateway::new(broker.clone(), names(), CATALOG_URL);
    (broker, gateway)
}

/// Handler failing for a fixed set of record ids
#[derive(Default)]
struct RecordingHandler {
    fail_ids: Vec<String>,
    seen: Vec<HarvestMessage>,
}

#[async_trait]
impl MessageHandler for RecordingHandler {
    async fn handle(&mut self, message: HarvestMessage) -> Result<()> {
        let fail = self.fail_ids.contains(&message.id);
        self.seen.push(message);
        if fail {
            return Err(HarvestError::Queue("simulated failure".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Publishing
// ============================================================================

#[tokio::test]
async fn test_enqueue_defaults_record_uri() {
    let (broker, gateway) = gateway();
    gateway.enqueue(HarvestOp::Harvest, " 42 ", None).await.unwrap();

    let payloads = broker.pending_payloads(&names()).await;
    let message = HarvestMessage::from_json(&payloads[0]).unwrap();
    assert_eq!(message.id, "42");
    assert_eq!(message.op, HarvestOp::Harvest);
    assert_eq!(message.uri, format!("{CATALOG_URL}/bib/42"));
}

#[tokio::test]
async fn test_enqueue_keeps_explicit_uri() {
    let (broker, gateway) = gateway();
    gateway
        .enqueue(HarvestOp::Harvest, "42", Some("http://mirror/bib/42"))
        .await
        .unwrap();

    let payloads = broker.pending_payloads(&names()).await;
    let message = HarvestMessage::from_json(&payloads[0]).unwrap();
    assert_eq!(message.uri, "http://mirror/bib/42");
}

#[tokio::test]
async fn test_publish_raw_accepts_known_operations() {
    let (_broker, gateway) = gateway();
    gateway.publish_raw("delete", "7", None).await.unwrap();
    assert_eq!(gateway.depth().await.unwrap(), 1);
}

#[tokio::test]
async fn test_publish_raw_rejects_unknown_operation_before_publishing() {
    let (_broker, gateway) = gateway();
    let result = gateway.publish_raw("frobnicate", "7", None).await;

    assert!(matches!(result, Err(HarvestError::InvalidOperation(_))));
    assert_eq!(gateway.depth().await.unwrap(), 0);
}

#[tokio::test]
async fn test_bulk_to_harvest_skips_blank_ids() {
    let (broker, gateway) = gateway();
    let ids: Vec<String> = ["1", "  ", "2", ""].iter().map(|s| s.to_string()).collect();

    let count = gateway.bulk_to_harvest(&ids).await.unwrap();
    assert_eq!(count, 2);

    let ids: Vec<String> = broker
        .pending_payloads(&names())
        .await
        .iter()
        .map(|p| HarvestMessage::from_json(p).unwrap().id)
        .collect();
    assert_eq!(ids, vec!["1", "2"]);
}

// ============================================================================
// Consuming
// ============================================================================

#[tokio::test]
async fn test_consume_acks_success_and_requeues_failure() {
    let (broker, gateway) = gateway();
    let ids: Vec<String> = ["1", "2", "3"].iter().map(|s| s.to_string()).collect();
    gateway.bulk_to_harvest(&ids).await.unwrap();

    let mut handler = RecordingHandler {
        fail_ids: vec!["2".to_string()],
        ..Default::default()
    };
    let summary = gateway.consume(&mut handler).await.unwrap();

    assert_eq!(summary.acked, 2);
    assert_eq!(summary.rejected, 1);
    assert_eq!(handler.seen.len(), 3);
    assert_eq!(broker.unacked(&names()).await, 0);

    // the failed record waits for the next pass
    assert_eq!(gateway.depth().await.unwrap(), 1);
    let payloads = broker.pending_payloads(&names()).await;
    assert_eq!(HarvestMessage::from_json(&payloads[0]).unwrap().id, "2");
}

#[tokio::test]
async fn test_requeued_message_is_marked_redelivered() {
    let (broker, gateway) = gateway();
    gateway.enqueue(HarvestOp::Harvest, "1", None).await.unwrap();

    let first = broker.fetch(&names()).await.unwrap().unwrap();
    assert!(!first.redelivered);
    broker.reject(&names(), first.tag, true).await.unwrap();

    let second = broker.fetch(&names()).await.unwrap().unwrap();
    assert!(second.redelivered);
    assert_eq!(second.payload, first.payload);
}

#[tokio::test]
async fn test_consume_discards_undecodable_payloads() {
    let (broker, gateway) = gateway();
    broker.publish(&names(), "not json").await.unwrap();
    gateway.enqueue(HarvestOp::Harvest, "1", None).await.unwrap();

    let mut handler = RecordingHandler::default();
    let summary = gateway.consume(&mut handler).await.unwrap();

    assert_eq!(summary.discarded, 1);
    assert_eq!(summary.acked, 1);
    assert_eq!(gateway.depth().await.unwrap(), 0);
}

#[tokio::test]
async fn test_consume_on_empty_queue_does_nothing() {
    let (_broker, gateway) = gateway();
    gateway.init().await.unwrap();

    let mut handler = RecordingHandler::default();
    let summary = gateway.consume(&mut handler).await.unwrap();
    assert_eq!(summary.total(), 0);
}

// ============================================================================
// Administration
// ============================================================================

#[tokio::test]
async fn test_purge_and_delete() {
    let (_broker, gateway) = gateway();
    gateway.init().await.unwrap();
    let ids: Vec<String> = ["1", "2"].iter().map(|s| s.to_string()).collect();
    gateway.bulk_to_harvest(&ids).await.unwrap();

    assert_eq!(gateway.purge().await.unwrap(), 2);
    assert_eq!(gateway.depth().await.unwrap(), 0);

    gateway.delete().await.unwrap();
    assert_eq!(gateway.depth().await.unwrap(), 0);
}
