//! Command dispatch: maps chat messages and interactive callbacks to actions
//! and posts the replies.

use chrono::Utc;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

use shared::logging::ComponentId;
use shared::{component_info, component_warn, ModuleConfig};

use crate::core::commands::{
    self, TextCommand, LOG_SELECT_ACTION_ID, PROCESS_ACTION_CALLBACK, RELOAD_ACTION_ID, STOP_ECOSYSTEM_CALLBACK,
};
use crate::core::process_control::ProcessControl;
use crate::error::{ReceiverError, ReceiverResult};
use crate::traits::{ChatClient, ProcessManager};
use crate::types::{EcosystemAction, InteractionAction, InteractionPayload, InteractionUser, SlackEvent};

pub const ECOSYSTEM_NOT_RUNNING: &str = "App is not running. Please start ecosystem manually.";

/// Chat reply describing why a command failed
pub fn reply_for_error(error: &ReceiverError) -> String {
    match error {
        ReceiverError::PermissionDenied { user, action } => format!("<@{user}> has no permissions to {action}."),
        ReceiverError::NotRunning { target } => format!("{target} is not running."),
        ReceiverError::SelfRestart { target } => format!("Can not restart or stop {target}: it runs the PM2 bot itself."),
        other => format!("Command failed: {other}"),
    }
}

/// Handles text commands and interactive callbacks
pub struct CommandHandler<P, C>
where
    P: ProcessManager,
    C: ChatClient,
{
    config: Arc<ModuleConfig>,
    control: ProcessControl<P>,
    chat: C,
    admins: Vec<String>,
}

impl<P, C> CommandHandler<P, C>
where
    P: ProcessManager,
    C: ChatClient,
{
    pub fn new(config: Arc<ModuleConfig>, control: ProcessControl<P>, chat: C) -> Self {
        let admins = config.admin_users();
        Self {
            config,
            control,
            chat,
            admins,
        }
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admins.iter().any(|admin| admin == user_id)
    }

    fn require_admin(&self, user: &InteractionUser, action: &str) -> ReceiverResult<()> {
        if self.is_admin(&user.id) {
            return Ok(());
        }
        component_warn!(ComponentId::Receiver, "🚫 {} tried to {}", user.id, action);
        Err(ReceiverError::PermissionDenied {
            user: user.display_name().to_string(),
            action: action.to_string(),
        })
    }

    async fn reply(&self, channel: &str, message: impl Into<Value>) -> ReceiverResult<()> {
        self.chat.post_message(channel, message.into()).await
    }

    /// Handle one Events API message. Bot posts and unknown commands are ignored.
    pub async fn handle_message(&self, event: &SlackEvent) -> ReceiverResult<()> {
        if !event.is_user_message() {
            return Ok(());
        }
        let (Some(channel), Some(user)) = (event.channel.as_deref(), event.user.as_deref()) else {
            return Ok(());
        };
        let Some(command) = event.text.as_deref().and_then(TextCommand::parse) else {
            return Ok(());
        };

        component_info!(ComponentId::Receiver, "💬 {:?} from {}", command, user);
        let reply = match command {
            TextCommand::Hi => commands::greeting(user),
            TextCommand::Help => commands::help_message(),
            TextCommand::Thx => commands::thanks(user),
            TextCommand::EmergencyStop => commands::confirm_stop(),
            TextCommand::List => match self.control.list().await {
                Ok(processes) => {
                    commands::list_message(&processes, &self.config.module_name(), Utc::now().timestamp_millis())
                }
                Err(e) => Value::String(reply_for_error(&e)),
            },
            TextCommand::InfoApp => match self.log_files().await {
                Ok(files) => commands::log_picker(&files),
                Err(e) => Value::String(reply_for_error(&e)),
            },
        };
        self.reply(channel, reply).await
    }

    /// Handle an interactivity payload. Each action is answered in the payload's channel.
    pub async fn handle_interaction(&self, payload: &InteractionPayload) -> ReceiverResult<()> {
        let Some(channel) = payload.channel_id() else {
            return Err(ReceiverError::InvalidRequest {
                details: "interaction without channel".to_string(),
            });
        };

        for action in &payload.actions {
            let outcome = self.handle_action(channel, payload, action).await;
            if let Err(e) = outcome {
                component_warn!(ComponentId::Receiver, "Action failed: {}", e);
                self.reply(channel, reply_for_error(&e)).await?;
            }
        }
        Ok(())
    }

    async fn handle_action(
        &self,
        channel: &str,
        payload: &InteractionPayload,
        action: &InteractionAction,
    ) -> ReceiverResult<()> {
        let user = &payload.user;

        if action.action_id.as_deref() == Some(LOG_SELECT_ACTION_ID) {
            return self.upload_logs(channel, user, action).await;
        }
        if action.action_id.as_deref() == Some(RELOAD_ACTION_ID) {
            self.require_admin(user, "reload")?;
            return self.ecosystem(channel, EcosystemAction::Reload, "Reloaded.").await;
        }

        match payload.callback_id.as_deref() {
            Some(STOP_ECOSYSTEM_CALLBACK) => {
                if action.value.as_deref() != Some("yes") {
                    return self.reply(channel, "Emergency stop cancelled.").await;
                }
                self.require_admin(user, "stop the ecosystem")?;
                self.ecosystem(channel, EcosystemAction::Stop, "Process stopped.").await
            }
            Some(PROCESS_ACTION_CALLBACK) => {
                let (Some(name), Some(target)) = (action.name.as_deref(), action.value.as_deref()) else {
                    return Err(ReceiverError::InvalidRequest {
                        details: "process action without name or value".to_string(),
                    });
                };
                self.require_admin(user, name)?;
                let (status, done) = match name {
                    "reload" => (self.control.restart(target).await?, "reloaded"),
                    "stop" => (self.control.stop(target).await?, "stopped"),
                    "start" => (self.control.start(target).await?, "started"),
                    other => {
                        return Err(ReceiverError::InvalidRequest {
                            details: format!("unknown process action {other}"),
                        });
                    }
                };
                self.reply(channel, format!("{} {}.", status.name, done)).await
            }
            _ => {
                component_warn!(ComponentId::Receiver, "Unhandled interaction {:?}", action);
                Ok(())
            }
        }
    }

    async fn ecosystem(&self, channel: &str, action: EcosystemAction, done: &str) -> ReceiverResult<()> {
        let app = self.config.ecosystem_app();
        let file = self.config.ecosystem_file();
        match self.control.run_ecosystem(action, &app, &file).await {
            Ok(()) => self.reply(channel, done).await,
            Err(ReceiverError::NotRunning { .. }) => self.reply(channel, ECOSYSTEM_NOT_RUNNING).await,
            Err(e) => Err(e),
        }
    }

    fn logs_dir(&self) -> ReceiverResult<PathBuf> {
        self.config
            .logs_path()
            .map(PathBuf::from)
            .ok_or_else(|| ReceiverError::InvalidRequest {
                details: "LOGS_PATH is not configured".to_string(),
            })
    }

    /// Sorted names of the regular files in the logs directory
    pub async fn log_files(&self) -> ReceiverResult<Vec<String>> {
        let mut entries = tokio::fs::read_dir(self.logs_dir()?).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                files.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        files.sort();
        Ok(files)
    }

    async fn upload_logs(&self, channel: &str, user: &InteractionUser, action: &InteractionAction) -> ReceiverResult<()> {
        let selected: Vec<&str> = action.selected_options.iter().map(|o| o.value.as_str()).collect();
        self.reply(channel, format!("<@{}> selected: {}", user.id, selected.join(",")))
            .await?;

        let dir = self.logs_dir()?;
        let title = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        for name in selected {
            if !commands::is_plain_file_name(name) {
                let error = ReceiverError::InvalidFileName { name: name.to_string() };
                component_warn!(ComponentId::Receiver, "{}", error);
                continue;
            }
            let uploaded = match tokio::fs::read(dir.join(name)).await {
                Ok(content) => self.chat.upload_file(channel, name, &title, content).await,
                Err(e) => Err(e.into()),
            };
            if let Err(e) = uploaded {
                component_warn!(ComponentId::Receiver, "Upload of {} failed: {}", name, e);
            }
        }
        Ok(())
    }
}
