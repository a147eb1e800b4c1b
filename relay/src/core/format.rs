//! Slack payload formatting for flushed batches

use serde_json::{json, Map, Value};

use shared::{EventKind, Message};

use crate::core::router::DestinationConfig;

/// Callback id carried by lifecycle buttons, handled by the command receiver
pub const PROCESS_ACTION_CALLBACK: &str = "process_action";

const LOG_COLOR: &str = "#2196F3";

/// Attachment colour for an event kind
pub fn color_for(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Start | EventKind::Online | EventKind::Restart => "good",
        EventKind::Stop | EventKind::Exit => "warning",
        EventKind::Error | EventKind::Exception | EventKind::RestartOverlimit | EventKind::Kill => "danger",
        EventKind::Log => LOG_COLOR,
    }
}

/// Escape the three characters Slack treats as control sequences
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn attachment(destination: &DestinationConfig, message: &Message) -> Value {
    let title = format!("{} {}", message.process_name, message.event_kind);
    let text = message.description.as_deref().map(escape).unwrap_or_default();

    let mut attachment = Map::new();
    attachment.insert(
        "fallback".to_string(),
        Value::String(match &message.description {
            Some(description) => format!("{title}: {description}"),
            None => title.clone(),
        }),
    );
    attachment.insert("color".to_string(), Value::String(color_for(message.event_kind).to_string()));
    attachment.insert("title".to_string(), Value::String(title));
    attachment.insert("text".to_string(), Value::String(text));
    attachment.insert("ts".to_string(), json!(message.timestamp));
    attachment.insert("mrkdwn_in".to_string(), json!(["text"]));

    if let Some(servername) = &destination.servername {
        attachment.insert("footer".to_string(), Value::String(servername.clone()));
    }

    if !message.interactive.is_empty() {
        attachment.insert("callback_id".to_string(), Value::String(PROCESS_ACTION_CALLBACK.to_string()));
        attachment.insert("actions".to_string(), Value::Array(message.interactive.clone()));
    }

    Value::Object(attachment)
}

/// Build the webhook body for one batch: one attachment per message, in order
pub fn build_payload(destination: &DestinationConfig, batch: &[Message]) -> Value {
    let mut payload = json!({
        "username": destination.username,
        "attachments": batch.iter().map(|m| attachment(destination, m)).collect::<Vec<_>>(),
    });

    if batch.len() > 1 {
        payload["text"] = Value::String(format!("{} notifications", batch.len()));
    }

    payload
}
