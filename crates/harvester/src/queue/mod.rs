//! Queue gateway and message brokers
//!
//! Harvest work travels as JSON [`HarvestMessage`]s through a [`Broker`].
//! Deliveries are acknowledged once processed and rejected (requeued)
//! otherwise, so every record is processed at least once.

mod broker;
mod gateway;
mod memory;
mod message;
mod postgres;

pub use broker::{Broker, Delivery, QueueNames};
pub use gateway::{ConsumeSummary, MessageHandler, QueueGateway};
pub use memory::InMemoryBroker;
pub use message::{HarvestMessage, HarvestOp};
pub use postgres::PgBroker;
