//! Slack Web API client for command replies and log uploads

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use std::time::Duration;

use shared::component_debug;
use shared::logging::ComponentId;

use crate::error::{ReceiverError, ReceiverResult};
use crate::traits::ChatClient;

pub const SLACK_API_BASE: &str = "https://slack.com/api";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Bot-token authenticated Web API client
pub struct RealChatClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl RealChatClient {
    pub fn new(token: impl Into<String>) -> ReceiverResult<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            token: token.into(),
            base_url: SLACK_API_BASE.to_string(),
        })
    }

    /// Point the client at another API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    /// Web API calls answer HTTP 200 with `ok: false` on failure
    async fn check(method: &str, response: reqwest::Response) -> ReceiverResult<Value> {
        let status = response.status();
        if !status.is_success() {
            return Err(ReceiverError::chat_api(method, format!("HTTP {status}")));
        }

        let body: Value = response.json().await?;
        if body.get("ok").and_then(Value::as_bool) != Some(true) {
            let error = body.get("error").and_then(Value::as_str).unwrap_or("unknown error");
            return Err(ReceiverError::chat_api(method, error));
        }
        Ok(body)
    }
}

/// Build a `chat.postMessage` body from a text or message object
pub fn message_body(channel: &str, message: Value) -> Value {
    let mut body = match message {
        Value::Object(map) => Value::Object(map),
        Value::String(text) => json!({ "text": text }),
        other => json!({ "text": other.to_string() }),
    };
    body["channel"] = Value::String(channel.to_string());
    body
}

#[async_trait]
impl ChatClient for RealChatClient {
    async fn post_message(&self, channel: &str, message: Value) -> ReceiverResult<()> {
        let response = self
            .client
            .post(self.url("chat.postMessage"))
            .bearer_auth(&self.token)
            .json(&message_body(channel, message))
            .send()
            .await?;

        Self::check("chat.postMessage", response).await?;
        component_debug!(ComponentId::Receiver, "💬 Replied in {}", channel);
        Ok(())
    }

    async fn upload_file(&self, channel: &str, filename: &str, title: &str, content: Vec<u8>) -> ReceiverResult<()> {
        let file = Part::bytes(content).file_name(filename.to_string());
        let form = Form::new()
            .text("channels", channel.to_string())
            .text("filename", filename.to_string())
            .text("title", title.to_string())
            .part("file", file);

        let response = self
            .client
            .post(self.url("files.upload"))
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await?;

        Self::check("files.upload", response).await?;
        component_debug!(ComponentId::Receiver, "📎 Uploaded {} to {}", filename, channel);
        Ok(())
    }
}
