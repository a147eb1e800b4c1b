//! Process-manager and Slack wire types used by the receiver

use serde::{Deserialize, Serialize};
use std::fmt;

/// Resource usage as reported by `pm2 jlist`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Monit {
    /// Resident memory in bytes
    #[serde(default)]
    pub memory: u64,
    #[serde(default)]
    pub cpu: f64,
}

/// The subset of `pm2_env` the commands use
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pm2Env {
    #[serde(default)]
    pub status: String,
    /// Epoch milliseconds of the last start
    #[serde(default)]
    pub pm_uptime: Option<i64>,
    #[serde(default)]
    pub restart_time: u32,
    #[serde(default)]
    pub pm_exec_path: Option<String>,
    #[serde(default)]
    pub pm_cwd: Option<String>,
}

/// One entry of the process manager's process list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessStatus {
    pub name: String,
    #[serde(default)]
    pub pm_id: Option<u32>,
    #[serde(default)]
    pub pid: Option<u32>,
    #[serde(default)]
    pub monit: Monit,
    #[serde(default)]
    pub pm2_env: Pm2Env,
}

impl ProcessStatus {
    pub fn is_online(&self) -> bool {
        self.pm2_env.status == "online"
    }

    /// Whether `id` names this process, by name or numeric pm_id
    pub fn matches(&self, id: &str) -> bool {
        self.name == id || self.pm_id.is_some_and(|pm_id| pm_id.to_string() == id)
    }
}

/// Per-process control action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessAction {
    Start,
    Stop,
    Restart,
}

impl ProcessAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessAction::Start => "start",
            ProcessAction::Stop => "stop",
            ProcessAction::Restart => "restart",
        }
    }
}

impl fmt::Display for ProcessAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action applied to a whole ecosystem file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcosystemAction {
    Reload,
    Stop,
}

impl EcosystemAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EcosystemAction::Reload => "reload",
            EcosystemAction::Stop => "stop",
        }
    }
}

impl fmt::Display for EcosystemAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of a Slack Events API request
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventEnvelope {
    UrlVerification { challenge: String },
    EventCallback { event: SlackEvent },
    #[serde(other)]
    Other,
}

/// Inner event of an `event_callback`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SlackEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
}

impl SlackEvent {
    /// Plain user message, as opposed to bot posts and edits
    pub fn is_user_message(&self) -> bool {
        self.kind == "message" && self.bot_id.is_none() && self.subtype.is_none() && self.user.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InteractionUser {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl InteractionUser {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().or(self.username.as_deref()).unwrap_or(self.id.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChannelRef {
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SelectedOption {
    pub value: String,
}

/// One clicked button or changed select
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InteractionAction {
    #[serde(default)]
    pub action_id: Option<String>,
    /// Legacy attachment buttons carry a name instead of an action id
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub selected_options: Vec<SelectedOption>,
}

/// `payload` of an interactivity request, for both block and attachment actions
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InteractionPayload {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub user: InteractionUser,
    #[serde(default)]
    pub channel: Option<ChannelRef>,
    #[serde(default)]
    pub callback_id: Option<String>,
    #[serde(default)]
    pub actions: Vec<InteractionAction>,
}

impl InteractionPayload {
    pub fn channel_id(&self) -> Option<&str> {
        self.channel.as_ref().map(|c| c.id.as_str())
    }
}
