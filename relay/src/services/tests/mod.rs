//! Tests for the relay services against real sockets and a mock HTTP server

pub mod slack_webhook;

use std::time::Duration;

use shared::{EventKind, Message};

use crate::core::DestinationConfig;

/// Standard timeout for async operations in tests
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

pub fn test_destination(slack_url: String) -> DestinationConfig {
    DestinationConfig {
        slack_url,
        username: "PM2".to_string(),
        servername: Some("test-host".to_string()),
        buffer: true,
        buffer_period: Duration::from_secs(2),
        buffer_max: Duration::from_secs(20),
        queue_max: 100,
    }
}

pub fn test_message(process_name: &str, kind: EventKind, description: &str) -> Message {
    Message {
        process_name: process_name.to_string(),
        event_kind: kind,
        description: Some(description.to_string()),
        timestamp: 1_705_314_600,
        interactive: Vec::new(),
    }
}
