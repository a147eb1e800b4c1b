//! Trait definitions with mockall annotations for testing
//!
//! The receiver talks to two external systems: the process manager and the
//! Slack Web API. Both sit behind these traits.

use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

use crate::error::ReceiverResult;
use crate::types::{EcosystemAction, ProcessAction, ProcessStatus};

/// Process manager access. Every call is a self-contained invocation.
#[mockall::automock]
#[async_trait]
pub trait ProcessManager: Send + Sync {
    async fn list_processes(&self) -> ReceiverResult<Vec<ProcessStatus>>;

    /// Look up one process by name or pm_id; `None` when it is not managed
    async fn describe_process(&self, id: &str) -> ReceiverResult<Option<ProcessStatus>>;

    async fn control_process(&self, action: ProcessAction, id: &str) -> ReceiverResult<()>;

    /// Apply `action` to the ecosystem `file`, run from `cwd`
    async fn run_ecosystem(&self, action: EcosystemAction, cwd: &Path, file: &str) -> ReceiverResult<()>;
}

/// Slack Web API access
#[mockall::automock]
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Post `message` (a text string or a message object) to `channel`
    async fn post_message(&self, channel: &str, message: Value) -> ReceiverResult<()>;

    async fn upload_file(&self, channel: &str, filename: &str, title: &str, content: Vec<u8>) -> ReceiverResult<()>;
}
