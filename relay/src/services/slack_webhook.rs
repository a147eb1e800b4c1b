//! Incoming-webhook delivery of flushed batches

use async_trait::async_trait;
use std::time::Duration;

use shared::logging::ComponentId;
use shared::{component_debug, Message};

use crate::core::format::build_payload;
use crate::core::DestinationConfig;
use crate::error::{RelayError, RelayResult};
use crate::traits::NotificationSink;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts each batch as one JSON body to the destination's webhook URL
pub struct RealSlackWebhook {
    client: reqwest::Client,
}

impl RealSlackWebhook {
    pub fn new() -> RelayResult<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> RelayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::config(format!("HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl NotificationSink for RealSlackWebhook {
    async fn deliver(&self, destination: &DestinationConfig, batch: &[Message]) -> RelayResult<()> {
        let body = build_payload(destination, batch);

        let response = self
            .client
            .post(&destination.slack_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RelayError::delivery(&destination.slack_url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::DeliveryRejected {
                destination: destination.slack_url.clone(),
                status: status.as_u16(),
                body,
            });
        }

        component_debug!(
            ComponentId::Relay,
            "📤 Delivered {} message(s) as {}",
            batch.len(),
            destination.username
        );
        Ok(())
    }
}
