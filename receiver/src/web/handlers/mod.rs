//! Request handlers for the Slack callbacks and health check

pub mod slack;

use axum::response::Json;
use serde_json::{json, Value};

/// Liveness probe
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "pm2-slack-receiver",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
