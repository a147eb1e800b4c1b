//! Slack Events API and interactivity endpoints
//!
//! Both endpoints acknowledge right away; the command runs in a spawned task
//! and answers through the Web API.

use axum::{
    extract::{Form, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use shared::component_debug;
use shared::logging::{self, ComponentId};

use crate::core::CommandHandler;
use crate::traits::{ChatClient, ProcessManager};
use crate::types::{EventEnvelope, InteractionPayload};

/// Header Slack sets on redelivered events
pub const RETRY_HEADER: &str = "x-slack-retry-num";

/// Form body of an interactivity request
#[derive(Debug, Deserialize)]
pub struct ActionForm {
    pub payload: String,
}

/// `POST /slack/events`
pub async fn events<P, C>(
    State(handler): State<Arc<CommandHandler<P, C>>>,
    headers: HeaderMap,
    Json(envelope): Json<EventEnvelope>,
) -> Response
where
    P: ProcessManager + 'static,
    C: ChatClient + 'static,
{
    if headers.contains_key(RETRY_HEADER) {
        component_debug!(ComponentId::Receiver, "Ignoring redelivered event");
        return StatusCode::OK.into_response();
    }

    match envelope {
        EventEnvelope::UrlVerification { challenge } => Json(json!({ "challenge": challenge })).into_response(),
        EventEnvelope::EventCallback { event } => {
            tokio::spawn(async move {
                if let Err(e) = handler.handle_message(&event).await {
                    logging::log_error(ComponentId::Receiver, "Text command", &e);
                }
            });
            StatusCode::OK.into_response()
        }
        EventEnvelope::Other => StatusCode::OK.into_response(),
    }
}

/// `POST /slack/actions`
pub async fn actions<P, C>(State(handler): State<Arc<CommandHandler<P, C>>>, Form(form): Form<ActionForm>) -> Response
where
    P: ProcessManager + 'static,
    C: ChatClient + 'static,
{
    let payload: InteractionPayload = match serde_json::from_str(&form.payload) {
        Ok(payload) => payload,
        Err(e) => {
            logging::log_error(ComponentId::Receiver, "Interaction payload", &e);
            return (StatusCode::BAD_REQUEST, "invalid payload").into_response();
        }
    };

    tokio::spawn(async move {
        if let Err(e) = handler.handle_interaction(&payload).await {
            logging::log_error(ComponentId::Receiver, "Interaction", &e);
        }
    });
    StatusCode::OK.into_response()
}
