//! Destination resolution and the process-wide queue table

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use shared::logging::ComponentId;
use shared::{component_info, component_warn, Message, ModuleConfig};

use crate::core::queue::MessageQueue;
use crate::traits::NotificationSink;

pub const DEFAULT_USERNAME: &str = "PM2";
pub const DEFAULT_BUFFER_SECONDS: u64 = 2;
pub const DEFAULT_BUFFER_MAX_SECONDS: u64 = 20;
pub const DEFAULT_QUEUE_MAX: usize = 100;

/// Fully resolved settings of one chat destination
#[derive(Debug, Clone, PartialEq)]
pub struct DestinationConfig {
    /// Incoming-webhook URL; also the destination's identity
    pub slack_url: String,
    pub username: String,
    /// Label shown in the notification footer
    pub servername: Option<String>,
    /// When false every message is delivered on its own, immediately
    pub buffer: bool,
    /// Quiet period after the last message before a flush
    pub buffer_period: Duration,
    /// Longest a message may wait in the buffer
    pub buffer_max: Duration,
    /// Pending count forcing an immediate flush (at least 1)
    pub queue_max: usize,
}

/// Maps process names to destinations using the module configuration
#[derive(Debug, Clone)]
pub struct DestinationResolver {
    config: Arc<ModuleConfig>,
}

impl DestinationResolver {
    pub fn new(config: Arc<ModuleConfig>) -> Self {
        Self { config }
    }

    /// Destination identity for `process_name`: its own `slack_url-<name>`, else the global `slack_url`
    pub fn destination_for(&self, process_name: &str) -> Option<String> {
        self.config.string_for("slack_url", process_name)
    }

    /// Resolve the full destination config, each parameter independently
    pub fn resolve(&self, process_name: &str) -> Option<DestinationConfig> {
        let slack_url = self.destination_for(process_name)?;
        let config = &self.config;

        Some(DestinationConfig {
            slack_url,
            username: config
                .string_for("username", process_name)
                .unwrap_or_else(|| DEFAULT_USERNAME.to_string()),
            servername: config.string_for("servername", process_name),
            buffer: config.bool_for("buffer", process_name).unwrap_or(true),
            buffer_period: config
                .seconds_for("buffer_seconds", process_name)
                .unwrap_or(Duration::from_secs(DEFAULT_BUFFER_SECONDS)),
            buffer_max: config
                .seconds_for("buffer_max_seconds", process_name)
                .unwrap_or(Duration::from_secs(DEFAULT_BUFFER_MAX_SECONDS)),
            queue_max: config
                .u64_for("queue_max", process_name)
                .map(|n| n.max(1) as usize)
                .unwrap_or(DEFAULT_QUEUE_MAX),
        })
    }
}

/// Routes messages into per-destination batching queues.
///
/// Queues are created on first use and live as long as the router. They are
/// keyed by destination URL, so processes sharing a URL share a queue and the
/// settings resolved for whichever of them was routed there first.
pub struct DestinationRouter<S>
where
    S: NotificationSink + 'static,
{
    resolver: DestinationResolver,
    sink: Arc<S>,
    queues: Mutex<HashMap<String, MessageQueue>>,
}

impl<S> DestinationRouter<S>
where
    S: NotificationSink + 'static,
{
    pub fn new(config: Arc<ModuleConfig>, sink: Arc<S>) -> Self {
        Self {
            resolver: DestinationResolver::new(config),
            sink,
            queues: Mutex::new(HashMap::new()),
        }
    }

    /// Enqueue `message` for its destination. Returns false when the message
    /// was dropped because no destination is configured for its process.
    pub async fn route(&self, message: Message) -> bool {
        let Some(slack_url) = self.resolver.destination_for(&message.process_name) else {
            return false;
        };

        let mut queues = self.queues.lock().await;
        if !queues.contains_key(&slack_url) {
            let Some(destination) = self.resolver.resolve(&message.process_name) else {
                return false;
            };
            component_info!(
                ComponentId::Relay,
                "📬 New destination for {} (buffer {:?}/{:?}, queue_max {})",
                message.process_name,
                destination.buffer_period,
                destination.buffer_max,
                destination.queue_max
            );
            queues.insert(slack_url.clone(), MessageQueue::spawn(destination, self.sink.clone()));
        }

        match queues.get(&slack_url).map(|queue| queue.enqueue(message)) {
            Some(Ok(())) => true,
            Some(Err(e)) => {
                component_warn!(ComponentId::Relay, "Failed to enqueue message: {}", e);
                false
            }
            None => false,
        }
    }

    /// Settings of the queue serving `slack_url`, if one has been created
    pub async fn destination(&self, slack_url: &str) -> Option<DestinationConfig> {
        self.queues
            .lock()
            .await
            .get(slack_url)
            .map(|queue| queue.destination().clone())
    }

    pub async fn queue_count(&self) -> usize {
        self.queues.lock().await.len()
    }
}
