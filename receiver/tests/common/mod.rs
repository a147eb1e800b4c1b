//! Test doubles and fixtures for receiver integration tests

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

use receiver::traits::MockProcessManager;
use receiver::types::{Pm2Env, ProcessStatus};
use receiver::{ChatClient, CommandHandler, ProcessControl, ReceiverResult};
use shared::ModuleConfig;

pub const ADMIN: &str = "UADMIN";
pub const RELAY_EXE: &str = "/opt/pm2-slack/pm2-slack-relay";

/// Something the chat client was asked to do
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCall {
    Post { channel: String, message: Value },
    Upload { channel: String, filename: String, content: Vec<u8> },
}

/// Chat client forwarding every call to the test
pub struct RecordingChat {
    calls: mpsc::UnboundedSender<ChatCall>,
}

pub struct ChatCalls {
    receiver: Mutex<mpsc::UnboundedReceiver<ChatCall>>,
}

impl ChatCalls {
    /// Wait for the next call, failing the test after a second
    pub async fn next(&self) -> ChatCall {
        tokio::time::timeout(Duration::from_secs(1), self.receiver.lock().await.recv())
            .await
            .expect("timed out waiting for a chat call")
            .expect("chat client dropped")
    }

    /// Wait for the next post and return its text
    pub async fn next_text(&self) -> String {
        match self.next().await {
            ChatCall::Post { message, .. } => match message {
                Value::String(text) => text,
                other => other["text"].as_str().unwrap_or_default().to_string(),
            },
            other => panic!("expected a post, got {other:?}"),
        }
    }
}

pub fn recording_chat() -> (RecordingChat, ChatCalls) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        RecordingChat { calls: tx },
        ChatCalls {
            receiver: Mutex::new(rx),
        },
    )
}

#[async_trait]
impl ChatClient for RecordingChat {
    async fn post_message(&self, channel: &str, message: Value) -> ReceiverResult<()> {
        let _ = self.calls.send(ChatCall::Post {
            channel: channel.to_string(),
            message,
        });
        Ok(())
    }

    async fn upload_file(&self, channel: &str, filename: &str, _title: &str, content: Vec<u8>) -> ReceiverResult<()> {
        let _ = self.calls.send(ChatCall::Upload {
            channel: channel.to_string(),
            filename: filename.to_string(),
            content,
        });
        Ok(())
    }
}

pub fn config() -> ModuleConfig {
    ModuleConfig::new()
        .with("SLACK_BOT_TOKEN", "xoxb-test")
        .with("SLACK_ADMIN_USERS", format!("{ADMIN} UOTHERADMIN"))
}

pub fn process(name: &str, pm_id: u32, exec_path: &str) -> ProcessStatus {
    ProcessStatus {
        name: name.to_string(),
        pm_id: Some(pm_id),
        pid: Some(1000 + pm_id),
        pm2_env: Pm2Env {
            status: "online".to_string(),
            pm_uptime: Some(0),
            restart_time: 0,
            pm_exec_path: Some(exec_path.to_string()),
            pm_cwd: Some("/srv/app".to_string()),
        },
        ..Default::default()
    }
}

/// Process manager knowing `app`, `api` and the relay itself
pub fn process_manager() -> MockProcessManager {
    let processes = vec![
        process("app", 0, "/srv/app/server.js"),
        process("api", 1, "/srv/api/index.js"),
        process("pm2-slack-plus", 2, RELAY_EXE),
    ];
    let mut manager = MockProcessManager::new();
    let listed = processes.clone();
    manager
        .expect_list_processes()
        .returning(move || Ok(listed.clone()));
    manager
        .expect_describe_process()
        .returning(move |id| Ok(processes.iter().find(|p| p.matches(id)).cloned()));
    manager
}

pub fn handler(config: ModuleConfig, manager: MockProcessManager) -> (Arc<CommandHandler<MockProcessManager, RecordingChat>>, ChatCalls) {
    let (chat, calls) = recording_chat();
    let control = ProcessControl::new(manager, RELAY_EXE);
    (Arc::new(CommandHandler::new(Arc::new(config), control, chat)), calls)
}
