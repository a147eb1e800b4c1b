//! Per-destination batching queue
//!
//! Each destination gets a batcher task that owns the pending sequence and a
//! delivery task that hands flushed batches to the sink one at a time. The
//! batcher is the only writer of its state, so enqueue and flush never
//! interleave; the separate delivery task lets a slow sink call overlap with
//! buffering of the next batch while batches still reach the sink in order.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

use shared::logging::ComponentId;
use shared::{component_debug, component_error, Message};

use crate::core::router::DestinationConfig;
use crate::error::{RelayError, RelayResult};
use crate::traits::NotificationSink;

/// Pending batch and its timer bookkeeping
#[derive(Debug, Default)]
pub struct BatchState {
    pending: Vec<Message>,
    first_at: Option<Instant>,
    last_at: Option<Instant>,
}

impl BatchState {
    pub fn push(&mut self, message: Message, now: Instant) {
        if self.pending.is_empty() {
            self.first_at = Some(now);
        }
        self.last_at = Some(now);
        self.pending.push(message);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Instant the pending batch must be flushed at, if any is pending: the end
    /// of the quiet period after the last message or the end of the maximum wait
    /// after the first, whichever comes first.
    pub fn deadline(&self, destination: &DestinationConfig) -> Option<Instant> {
        let quiet = self.last_at? + destination.buffer_period;
        let max = self.first_at? + destination.buffer_max;
        Some(quiet.min(max))
    }

    /// Whether the pending count forces an immediate flush
    pub fn must_flush_now(&self, destination: &DestinationConfig) -> bool {
        !destination.buffer || self.pending.len() >= destination.queue_max
    }

    /// Take the whole pending sequence and reset the timers
    pub fn take(&mut self) -> Vec<Message> {
        self.first_at = None;
        self.last_at = None;
        std::mem::take(&mut self.pending)
    }
}

/// Handle to a destination's batching queue
#[derive(Debug, Clone)]
pub struct MessageQueue {
    destination: Arc<DestinationConfig>,
    sender: mpsc::UnboundedSender<Message>,
}

impl MessageQueue {
    /// Spawn the batcher and delivery tasks for `destination`
    pub fn spawn<S>(destination: DestinationConfig, sink: Arc<S>) -> Self
    where
        S: NotificationSink + 'static,
    {
        let destination = Arc::new(destination);
        let (sender, receiver) = mpsc::unbounded_channel();
        let (batch_tx, batch_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_batcher(destination.clone(), receiver, batch_tx));
        tokio::spawn(run_delivery(destination.clone(), sink, batch_rx));

        Self { destination, sender }
    }

    /// Append a message to the pending batch. Never blocks.
    pub fn enqueue(&self, message: Message) -> RelayResult<()> {
        self.sender.send(message).map_err(|_| RelayError::ChannelClosed {
            channel: format!("queue for {}", self.destination.slack_url),
        })
    }

    pub fn destination(&self) -> &DestinationConfig {
        &self.destination
    }
}

async fn run_batcher(
    destination: Arc<DestinationConfig>,
    mut receiver: mpsc::UnboundedReceiver<Message>,
    batches: mpsc::UnboundedSender<Vec<Message>>,
) {
    let mut state = BatchState::default();

    loop {
        let deadline = state.deadline(&destination);

        tokio::select! {
            received = receiver.recv() => match received {
                Some(message) => {
                    state.push(message, Instant::now());
                    if state.must_flush_now(&destination) {
                        flush(&destination, &mut state, &batches);
                    }
                }
                None => {
                    if !state.is_empty() {
                        flush(&destination, &mut state, &batches);
                    }
                    break;
                }
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                flush(&destination, &mut state, &batches);
            }
        }
    }
}

fn flush(destination: &DestinationConfig, state: &mut BatchState, batches: &mpsc::UnboundedSender<Vec<Message>>) {
    let batch = state.take();
    component_debug!(
        ComponentId::Relay,
        "📦 Flushing {} message(s) for {}",
        batch.len(),
        destination.slack_url
    );
    if batches.send(batch).is_err() {
        component_error!(ComponentId::Relay, "Delivery task for {} is gone", destination.slack_url);
    }
}

async fn run_delivery<S>(
    destination: Arc<DestinationConfig>,
    sink: Arc<S>,
    mut batches: mpsc::UnboundedReceiver<Vec<Message>>,
) where
    S: NotificationSink + 'static,
{
    while let Some(batch) = batches.recv().await {
        if let Err(e) = sink.deliver(&destination, &batch).await {
            component_error!(
                ComponentId::Relay,
                "❌ Dropping batch of {} message(s) for {}: {}",
                batch.len(),
                destination.slack_url,
                e
            );
        }
    }
}
