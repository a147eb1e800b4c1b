//! Relay-specific error types

use shared::SharedError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Failed to connect to PM2 bus at {path}: {message}")]
    BusConnectFailed { path: String, message: String },

    #[error("Malformed bus frame: {message}")]
    FrameError { message: String },

    #[error("Notification delivery to {destination} failed: {message}")]
    DeliveryFailed { destination: String, message: String },

    #[error("Notification rejected by {destination}: HTTP {status} {body}")]
    DeliveryRejected {
        destination: String,
        status: u16,
        body: String,
    },

    #[error("Configuration error: {field}")]
    ConfigurationError { field: String },

    #[error("Channel closed: {channel}")]
    ChannelClosed { channel: String },

    #[error("Shared component error: {0}")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl RelayError {
    pub fn config(field: impl Into<String>) -> Self {
        Self::ConfigurationError { field: field.into() }
    }

    pub fn frame(message: impl Into<String>) -> Self {
        Self::FrameError {
            message: message.into(),
        }
    }

    pub fn delivery(destination: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::DeliveryFailed {
            destination: destination.into(),
            message: message.to_string(),
        }
    }
}

pub type RelayResult<T> = Result<T, RelayError>;
