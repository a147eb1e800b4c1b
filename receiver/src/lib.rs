//! Slack command receiver
//!
//! Serves the Slack Events API and interactivity callbacks, answering chat
//! commands with process-manager state and performing admin-gated process
//! actions.

pub mod core;
pub mod error;
pub mod receiver_impl;
pub mod services;
pub mod traits;
pub mod types;
pub mod web;

// Re-export commonly used types
pub use crate::core::{CommandHandler, ProcessControl, TextCommand};
pub use error::{ReceiverError, ReceiverResult};
pub use receiver_impl::Receiver;
pub use traits::{ChatClient, ProcessManager};
