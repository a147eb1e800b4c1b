//! Main receiver implementation
//!
//! Owns the command handler and serves the Slack callback endpoints with axum.

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use shared::logging::{self, ComponentId};
use shared::{component_info, ModuleConfig};

use crate::core::{CommandHandler, ProcessControl};
use crate::error::{ReceiverError, ReceiverResult};
use crate::traits::{ChatClient, ProcessManager};
use crate::web::handlers::{self, slack};

/// Chat command receiver with injected process manager and chat client
pub struct Receiver<P, C>
where
    P: ProcessManager + 'static,
    C: ChatClient + 'static,
{
    handler: Arc<CommandHandler<P, C>>,
}

impl<P, C> Receiver<P, C>
where
    P: ProcessManager + 'static,
    C: ChatClient + 'static,
{
    pub fn new(config: Arc<ModuleConfig>, control: ProcessControl<P>, chat: C) -> Self {
        Self {
            handler: Arc::new(CommandHandler::new(config, control, chat)),
        }
    }

    /// Build the Axum router with all routes
    pub fn build_router(&self) -> Router {
        Router::new()
            .route("/slack/events", post(slack::events::<P, C>))
            .route("/slack/actions", post(slack::actions::<P, C>))
            .route("/health", get(handlers::health_check))
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
            .with_state(self.handler.clone())
    }

    /// Bind `addr` and serve until the server fails
    pub async fn run(&self, addr: SocketAddr) -> ReceiverResult<()> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ReceiverError::ServerStartup(format!("Failed to bind to {addr}: {e}")))?;

        logging::log_startup(ComponentId::Receiver, "Slack command receiver");
        component_info!(ComponentId::Receiver, "🌐 Listening for Slack callbacks on http://{}", addr);

        axum::serve(listener, self.build_router())
            .await
            .map_err(|e| ReceiverError::ServerStartup(format!("Server error: {e}")))
    }
}
