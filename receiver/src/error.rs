//! Receiver-specific error types

use shared::SharedError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReceiverError {
    #[error("User {user} is not allowed to {action}")]
    PermissionDenied { user: String, action: String },

    #[error("Process {target} is not running")]
    NotRunning { target: String },

    #[error("Refusing to touch {target}: it is the relay's own process")]
    SelfRestart { target: String },

    #[error("Process manager error: {message}")]
    ProcessManagerError { message: String },

    #[error("Slack API call {method} failed: {message}")]
    ChatApiError { method: String, message: String },

    #[error("Invalid request format: {details}")]
    InvalidRequest { details: String },

    #[error("Invalid log file name: {name}")]
    InvalidFileName { name: String },

    #[error("Shared component error: {0}")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Server startup error: {0}")]
    ServerStartup(String),
}

impl ReceiverError {
    pub fn process_manager(message: impl Into<String>) -> Self {
        Self::ProcessManagerError {
            message: message.into(),
        }
    }

    pub fn chat_api(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ChatApiError {
            method: method.into(),
            message: message.into(),
        }
    }

    pub fn not_running(target: impl Into<String>) -> Self {
        Self::NotRunning { target: target.into() }
    }
}

pub type ReceiverResult<T> = Result<T, ReceiverError>;
