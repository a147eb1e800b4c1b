//! Shared error types for the relay workspace

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Failed to read configuration file {path}: {message}")]
    ConfigRead { path: String, message: String },

    #[error("Configuration file {path} is not a JSON object")]
    ConfigShape { path: String },

    #[error("Invalid configuration: {field} = {value}")]
    InvalidConfig { field: String, value: String },

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl SharedError {
    pub fn invalid(field: impl Into<String>, value: impl std::fmt::Display) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            value: value.to_string(),
        }
    }
}

pub type SharedResult<T> = Result<T, SharedError>;
