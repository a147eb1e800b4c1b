//! Chat commands and their reply templates

use serde_json::{json, Value};

use crate::types::ProcessStatus;

pub const RELOAD_ACTION_ID: &str = "button-reload";
pub const STOP_ECOSYSTEM_CALLBACK: &str = "stop_ecosystem";
pub const LOG_SELECT_ACTION_ID: &str = "multi_static_select_logs";
pub const PROCESS_ACTION_CALLBACK: &str = "process_action";

/// Text commands understood in chat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextCommand {
    Hi,
    Help,
    List,
    EmergencyStop,
    Thx,
    InfoApp,
}

impl TextCommand {
    /// Match the first word of `text`, ignoring case
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?.to_lowercase();
        match word.as_str() {
            "hi" => Some(TextCommand::Hi),
            "help" => Some(TextCommand::Help),
            "list" => Some(TextCommand::List),
            "emergency_stop" => Some(TextCommand::EmergencyStop),
            "thx" => Some(TextCommand::Thx),
            "info_app" => Some(TextCommand::InfoApp),
            _ => None,
        }
    }
}

/// Compact age of `timestamp_ms` relative to `now_ms`: `Ns`, `Nm Ns`, `Nh Nm` or `Nd Nh`
pub fn time_since(timestamp_ms: i64, now_ms: i64) -> String {
    let total = (now_ms - timestamp_ms).abs() / 1000;
    let (days, hours, minutes, seconds) = (total / 86_400, total / 3600 % 24, total / 60 % 60, total % 60);

    if total < 60 {
        format!("{total}s")
    } else if total < 3600 {
        format!("{minutes}m {seconds}s")
    } else if total < 86_400 {
        format!("{}h {minutes}m", total / 3600)
    } else {
        format!("{days}d {hours}h")
    }
}

fn status_emoji(status: &str) -> &'static str {
    match status {
        "online" => "\u{1F7E2}",
        "stopping" | "stopped" => "\u{1F6AB}",
        "launching" => "\u{267B}",
        "errored" => "\u{1F198}",
        _ => "",
    }
}

fn plain_text(text: impl Into<String>) -> Value {
    json!({"type": "plain_text", "text": text.into(), "emoji": true})
}

fn field(label: &str, value: impl std::fmt::Display) -> Value {
    json!({"type": "mrkdwn", "text": format!("*{label}:* {value}")})
}

pub fn greeting(user: &str) -> Value {
    Value::String(format!(
        "Hey there <@{user}>!\nIf you want to see the list of available commands type in chat: \"help\""
    ))
}

pub fn thanks(user: &str) -> Value {
    Value::String(format!("You're welcome <@{user}>!"))
}

pub fn help_message() -> Value {
    let commands = [
        ("hi", "say hello"),
        ("list", "show every PM2 process with its status, uptime, memory and CPU"),
        ("emergency_stop", "stop the whole ecosystem after confirmation"),
        ("info_app", "pick log files to upload to this channel"),
        ("thx", "you're welcome"),
    ];
    let lines: Vec<String> = commands.iter().map(|(name, what)| format!("`{name}` {what}")).collect();

    json!({
        "text": "Available commands",
        "blocks": [
            {"type": "header", "text": plain_text("Available commands")},
            {"type": "section", "text": {"type": "mrkdwn", "text": lines.join("\n")}}
        ]
    })
}

pub fn confirm_stop() -> Value {
    json!({
        "text": "Emergency stop",
        "attachments": [{
            "text": "Do you really want to stop the ecosystem?",
            "fallback": "Emergency stop confirmation",
            "callback_id": STOP_ECOSYSTEM_CALLBACK,
            "color": "danger",
            "attachment_type": "default",
            "actions": [
                {"name": "confirm", "text": "Yes", "type": "button", "style": "danger", "value": "yes"},
                {"name": "confirm", "text": "No", "type": "button", "value": "no"}
            ]
        }]
    })
}

pub fn reload_button() -> Value {
    json!({
        "type": "actions",
        "elements": [{
            "type": "button",
            "text": plain_text("Reload ecosystem"),
            "style": "primary",
            "value": "reload",
            "action_id": RELOAD_ACTION_ID
        }]
    })
}

/// Process overview: a header and a field section per process, then the reload button
pub fn list_message(processes: &[ProcessStatus], module_name: &str, now_ms: i64) -> Value {
    let mut blocks = Vec::with_capacity(processes.len() * 2 + 1);

    for process in processes {
        let title = if process.name == module_name {
            format!("{} - MODULE", process.name)
        } else {
            process.name.clone()
        };
        let env = &process.pm2_env;
        let uptime = match env.pm_uptime {
            Some(started) if process.is_online() => time_since(started, now_ms),
            _ => "0".to_string(),
        };
        let id = process.pm_id.map(|id| id.to_string()).unwrap_or_default();

        blocks.push(json!({"type": "header", "text": plain_text(title)}));
        blocks.push(json!({
            "type": "section",
            "fields": [
                field("Status", format!("{} {}", env.status, status_emoji(&env.status)).trim_end()),
                field("Uptime", uptime),
                field("MEM", format!("{}Mb", (process.monit.memory as f64 / 1024.0 / 1024.0).round())),
                field("Restarts Count", env.restart_time),
                field("CPU", format!("{} %", process.monit.cpu)),
                field("ID", id),
            ]
        }));
    }

    blocks.push(reload_button());
    json!({"text": "List of Processes", "blocks": blocks})
}

/// Multi-select of the available log files
pub fn log_picker(files: &[String]) -> Value {
    let options: Vec<Value> = files
        .iter()
        .map(|file| json!({"text": plain_text(file.as_str()), "value": file}))
        .collect();

    json!({
        "text": "List of logs",
        "blocks": [{
            "type": "section",
            "text": {"type": "mrkdwn", "text": "Pick a log from the dropdown"},
            "accessory": {
                "type": "multi_static_select",
                "placeholder": plain_text("Select log"),
                "options": options,
                "action_id": LOG_SELECT_ACTION_ID
            }
        }]
    })
}

/// Plain file name inside the logs directory; no separators or parent references
pub fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\', '\0'])
}
