//! Test doubles and fixtures for relay integration tests

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use relay::{DestinationConfig, EventSource, NotificationSink, RelayResult};
use shared::{InboundEvent, Message};

/// Event source fed by the test through a channel
pub struct ChannelSource {
    receiver: Mutex<Option<mpsc::Receiver<InboundEvent>>>,
}

impl ChannelSource {
    pub fn new() -> (Self, mpsc::Sender<InboundEvent>) {
        let (tx, rx) = mpsc::channel(64);
        (
            Self {
                receiver: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

#[async_trait]
impl EventSource for ChannelSource {
    async fn start(&self) -> RelayResult<mpsc::Receiver<InboundEvent>> {
        Ok(self
            .receiver
            .lock()
            .await
            .take()
            .expect("source started twice"))
    }
}

/// Sink keeping every delivered batch with its destination URL
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub batches: Arc<Mutex<Vec<(String, Vec<Message>)>>>,
}

impl RecordingSink {
    pub async fn delivered(&self) -> Vec<(String, Vec<Message>)> {
        self.batches.lock().await.clone()
    }

    pub async fn descriptions(&self) -> Vec<String> {
        self.batches
            .lock()
            .await
            .iter()
            .flat_map(|(_, batch)| batch.iter())
            .filter_map(|m| m.description.clone())
            .collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, destination: &DestinationConfig, batch: &[Message]) -> RelayResult<()> {
        self.batches
            .lock()
            .await
            .push((destination.slack_url.clone(), batch.to_vec()));
        Ok(())
    }
}

pub fn process(name: &str) -> Value {
    json!({"name": name, "exec_mode": "fork_mode", "instances": 1, "pm_id": 0})
}

pub fn cluster_process(name: &str, pm_id: u32) -> Value {
    json!({"name": name, "exec_mode": "cluster_mode", "instances": 4, "pm_id": pm_id})
}

pub fn log_err(process: Value, data: &str) -> InboundEvent {
    InboundEvent::from_bus("log:err", json!({"process": process, "data": data}))
        .unwrap()
        .unwrap()
}

pub fn lifecycle(process: Value, event: &str) -> InboundEvent {
    InboundEvent::from_bus("process:event", json!({"process": process, "event": event}))
        .unwrap()
        .unwrap()
}
