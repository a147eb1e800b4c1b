//! PM2 event bus listener
//!
//! PM2 publishes process events on an axon pub socket at `$PM2_HOME/pub.sock`.
//! The listener subscribes to it, decodes amp frames and forwards every
//! recognised event. A lost connection is retried with a growing delay.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::net::UnixStream;
use tokio::sync::mpsc;

use shared::logging::ComponentId;
use shared::{component_debug, component_info, component_warn, InboundEvent};

use crate::error::{RelayError, RelayResult};
use crate::services::amp::{into_bus_message, read_frame};
use crate::traits::EventSource;

pub const PUB_SOCKET_NAME: &str = "pub.sock";

const EVENT_CHANNEL_CAPACITY: usize = 1024;
const INITIAL_RECONNECT_DELAY: Duration = Duration::from_millis(500);
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

/// Event source reading PM2's publish socket
pub struct RealPm2Bus {
    socket_path: PathBuf,
    reconnect_delay: Duration,
}

impl RealPm2Bus {
    /// Listener for the bus of the PM2 daemon rooted at `pm2_home`
    pub fn new(pm2_home: impl AsRef<Path>) -> Self {
        Self::with_socket(pm2_home.as_ref().join(PUB_SOCKET_NAME))
    }

    pub fn with_socket(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            reconnect_delay: INITIAL_RECONNECT_DELAY,
        }
    }

    /// Override the first reconnect delay
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

enum StreamEnd {
    Closed,
    ReceiverDropped,
}

/// Forward events from one connection until it ends
async fn pump(stream: &mut UnixStream, tx: &mpsc::Sender<InboundEvent>) -> RelayResult<StreamEnd> {
    loop {
        let Some(frame) = read_frame(stream).await? else {
            return Ok(StreamEnd::Closed);
        };

        let event = frame
            .decode()
            .and_then(into_bus_message)
            .and_then(|(topic, packet)| InboundEvent::from_bus(&topic, packet).map_err(RelayError::from));

        match event {
            Ok(Some(event)) => {
                if tx.send(event).await.is_err() {
                    return Ok(StreamEnd::ReceiverDropped);
                }
            }
            Ok(None) => {}
            Err(e) => component_warn!(ComponentId::Relay, "Skipping bus message: {}", e),
        }
    }
}

async fn listen(socket_path: PathBuf, first_delay: Duration, tx: mpsc::Sender<InboundEvent>) {
    let mut delay = first_delay;

    loop {
        match UnixStream::connect(&socket_path).await {
            Ok(mut stream) => {
                component_info!(ComponentId::Relay, "🔌 Connected to PM2 bus at {}", socket_path.display());
                delay = first_delay;

                match pump(&mut stream, &tx).await {
                    Ok(StreamEnd::ReceiverDropped) => break,
                    Ok(StreamEnd::Closed) => {
                        component_warn!(ComponentId::Relay, "PM2 bus closed the connection");
                    }
                    Err(e) => {
                        component_warn!(ComponentId::Relay, "PM2 bus connection lost: {}", e);
                    }
                }
            }
            Err(e) => {
                let error = RelayError::BusConnectFailed {
                    path: socket_path.display().to_string(),
                    message: e.to_string(),
                };
                component_debug!(ComponentId::Relay, "{}", error);
            }
        }

        if tx.is_closed() {
            break;
        }

        component_debug!(ComponentId::Relay, "Reconnecting to PM2 bus in {:?}", delay);
        tokio::time::sleep(delay).await;
        delay = (delay * 2).min(MAX_RECONNECT_DELAY);
    }

    component_debug!(ComponentId::Relay, "PM2 bus listener stopped");
}

#[async_trait]
impl EventSource for RealPm2Bus {
    async fn start(&self) -> RelayResult<mpsc::Receiver<InboundEvent>> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        tokio::spawn(listen(self.socket_path.clone(), self.reconnect_delay, tx));
        Ok(rx)
    }
}
