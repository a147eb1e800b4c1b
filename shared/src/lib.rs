//! Shared types for the PM2 → Slack relay
//!
//! Contains the canonical event model, the module configuration and the
//! logging setup used by both the relay pipeline and the command receiver.

pub mod config;
pub mod errors;
pub mod logging;
pub mod types;

pub use config::ModuleConfig;
pub use errors::*;
pub use types::*;
