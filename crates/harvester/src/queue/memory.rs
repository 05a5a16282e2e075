//! In-process broker for tests and single-process runs

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;

use super::broker::{Broker, Delivery, QueueNames};
use crate::error::{HarvestError, Result};

#[derive(Debug, Default)]
struct MemoryQueue {
    ready: VecDeque<Delivery>,
    unacked: HashMap<i64, Delivery>,
}

#[derive(Debug, Default)]
struct State {
    queues: HashMap<String, MemoryQueue>,
    next_tag: i64,
}

/// Broker held entirely in memory.
///
/// Publishing to an undeclared queue declares it. Unacked deliveries are
/// only returned to the queue by an explicit reject.
#[derive(Debug, Default)]
pub struct InMemoryBroker {
    state: Mutex<State>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliveries fetched but not yet acked or rejected
    pub async fn unacked(&self, names: &QueueNames) -> usize {
        let state = self.state.lock().await;
        state
            .queues
            .get(&names.queue)
            .map_or(0, |q| q.unacked.len())
    }

    /// Payloads waiting in the queue, in delivery order
    pub async fn pending_payloads(&self, names: &QueueNames) -> Vec<String> {
        let state = self.state.lock().await;
        state
            .queues
            .get(&names.queue)
            .map(|q| q.ready.iter().map(|d| d.payload.clone()).collect())
            .unwrap_or_default()
    }
}

fn unknown_delivery(names: &QueueNames, tag: i64) -> HarvestError {
    HarvestError::Queue(format!("unknown delivery tag {tag} on queue {}", names.queue))
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn declare(&self, names: &QueueNames) -> Result<()> {
        let mut state = self.state.lock().await;
        state.queues.entry(names.queue.clone()).or_default();
        Ok(())
    }

    async fn purge(&self, names: &QueueNames) -> Result<u64> {
        let mut state = self.state.lock().await;
        Ok(state
            .queues
            .get_mut(&names.queue)
            .map_or(0, |q| {
                let removed = q.ready.len() as u64;
                q.ready.clear();
                removed
            }))
    }

    async fn delete(&self, names: &QueueNames) -> Result<()> {
        let mut state = self.state.lock().await;
        state.queues.remove(&names.queue);
        Ok(())
    }

    async fn publish(&self, names: &QueueNames, payload: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.next_tag += 1;
        let tag = state.next_tag;
        state
            .queues
            .entry(names.queue.clone())
            .or_default()
            .ready
            .push_back(Delivery {
                tag,
                payload: payload.to_string(),
                redelivered: false,
            });
        Ok(())
    }

    async fn fetch(&self, names: &QueueNames) -> Result<Option<Delivery>> {
        let mut state = self.state.lock().await;
        let Some(queue) = state.queues.get_mut(&names.queue) else {
            return Ok(None);
        };
        let Some(delivery) = queue.ready.pop_front() else {
            return Ok(None);
        };
        queue.unacked.insert(delivery.tag, delivery.clone());
        Ok(Some(delivery))
    }

    async fn ack(&self, names: &QueueNames, tag: i64) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .queues
            .get_mut(&names.queue)
            .and_then(|q| q.unacked.remove(&tag))
            .map(|_| ())
            .ok_or_else(|| unknown_delivery(names, tag))
    }

    async fn reject(&self, names: &QueueNames, tag: i64, requeue: bool) -> Result<()> {
        let mut state = self.state.lock().await;
        let queue = state
            .queues
            .get_mut(&names.queue)
            .ok_or_else(|| unknown_delivery(names, tag))?;
        let mut delivery = queue
            .unacked
            .remove(&tag)
            .ok_or_else(|| unknown_delivery(names, tag))?;

        if requeue {
            delivery.redelivered = true;
            queue.ready.push_back(delivery);
        }
        Ok(())
    }

    async fn depth(&self, names: &QueueNames) -> Result<u64> {
        let state = self.state.lock().await;
        Ok(state
            .queues
            .get(&names.queue)
            .map_or(0, |q| q.ready.len() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> QueueNames {
        QueueNames {
            exchange: "x".to_string(),
            queue: "q".to_string(),
            routing_key: "k".to_string(),
        }
    }

    #[tokio::test]
    async fn test_fetch_ack_reject_cycle() {
        let broker = InMemoryBroker::new();
        let names = names();
        broker.publish(&names, "one").await.unwrap();
        broker.publish(&names, "two").await.unwrap();

        let first = broker.fetch(&names).await.unwrap().unwrap();
        assert_eq!(first.payload, "one");
        assert_eq!(broker.depth(&names).await.unwrap(), 1);
        assert_eq!(broker.unacked(&names).await, 1);

        broker.reject(&names, first.tag, true).await.unwrap();
        assert_eq!(broker.pending_payloads(&names).await, vec!["two", "one"]);

        let second = broker.fetch(&names).await.unwrap().unwrap();
        broker.ack(&names, second.tag).await.unwrap();
        let redelivered = broker.fetch(&names).await.unwrap().unwrap();
        assert!(redelivered.redelivered);
        broker.reject(&names, redelivered.tag, false).await.unwrap();

        assert_eq!(broker.depth(&names).await.unwrap(), 0);
        assert_eq!(broker.unacked(&names).await, 0);
        assert!(broker.ack(&names, second.tag).await.is_err());
    }

    #[tokio::test]
    async fn test_purge_and_delete_are_idempotent() {
        let broker = InMemoryBroker::new();
        let names = names();
        broker.declare(&names).await.unwrap();
        broker.publish(&names, "one").await.unwrap();

        assert_eq!(broker.purge(&names).await.unwrap(), 1);
        assert_eq!(broker.purge(&names).await.unwrap(), 0);
        broker.delete(&names).await.unwrap();
        broker.delete(&names).await.unwrap();
        assert!(broker.fetch(&names).await.unwrap().is_none());
    }
}
