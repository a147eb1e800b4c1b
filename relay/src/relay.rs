//! Relay pipeline
//!
//! Pulls events from the injected event source, normalizes them and routes
//! the resulting messages into the per-destination batching queues.

use std::sync::Arc;
use tokio::sync::mpsc;

use shared::logging::{self, ComponentId};
use shared::{component_debug, component_info, InboundEvent, ModuleConfig};

use crate::core::{DestinationRouter, Normalizer};
use crate::error::RelayResult;
use crate::traits::{EventSource, NotificationSink};

/// Event pipeline from the process-manager bus to chat destinations
pub struct Relay<E, S>
where
    E: EventSource + 'static,
    S: NotificationSink + 'static,
{
    source: E,
    normalizer: Normalizer,
    router: DestinationRouter<S>,

    /// Shutdown signal
    shutdown_tx: mpsc::Sender<()>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl<E, S> Relay<E, S>
where
    E: EventSource + 'static,
    S: NotificationSink + 'static,
{
    /// Create a relay with injected source and sink
    pub fn new(config: Arc<ModuleConfig>, source: E, sink: S) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        Self {
            source,
            normalizer: Normalizer::new(config.clone()),
            router: DestinationRouter::new(config, Arc::new(sink)),
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Get a sender that stops `run` when signalled
    pub fn get_shutdown_sender(&self) -> mpsc::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Normalize and route a single event. Returns true when a message was enqueued.
    pub async fn handle_event(&self, event: InboundEvent) -> bool {
        let topic = event.topic();
        match self.normalizer.normalize(event) {
            Some(message) => self.router.route(message).await,
            None => {
                component_debug!(ComponentId::Relay, "Filtered {} event", topic);
                false
            }
        }
    }

    /// Main loop: runs until shutdown is signalled or the event stream ends
    pub async fn run(&mut self) -> RelayResult<()> {
        let mut events = self.source.start().await?;
        logging::log_success(ComponentId::Relay, "Listening for process events");

        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Some(event) => {
                        self.handle_event(event).await;
                    }
                    None => {
                        component_info!(ComponentId::Relay, "Event stream ended");
                        break;
                    }
                },
                _ = self.shutdown_rx.recv() => {
                    logging::log_shutdown(ComponentId::Relay, "Shutdown requested");
                    break;
                }
            }
        }

        Ok(())
    }

    pub fn router(&self) -> &DestinationRouter<S> {
        &self.router
    }
}
