//! Trait definitions with mockall annotations for testing
//!
//! The two I/O seams of the relay: where bus events come from and where
//! flushed batches go.

use async_trait::async_trait;
use shared::{InboundEvent, Message};
use tokio::sync::mpsc;

use crate::core::DestinationConfig;
use crate::error::RelayResult;

/// Delivery of one flushed batch to a chat destination
#[mockall::automock]
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver `batch` as a single combined notification.
    ///
    /// Messages are in enqueue order. A failed delivery is terminal for the
    /// batch; the caller logs it and moves on.
    async fn deliver(&self, destination: &DestinationConfig, batch: &[Message]) -> RelayResult<()>;
}

/// Source of inbound process-manager events
#[mockall::automock]
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Start listening and return the receiving end of the event stream.
    ///
    /// The stream ends when the source gives up for good.
    async fn start(&self) -> RelayResult<mpsc::Receiver<InboundEvent>>;
}
