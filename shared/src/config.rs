//! Module configuration
//!
//! PM2 modules receive their configuration as one flat key/value object. Any
//! key may be specialised for a single process by suffixing it with
//! `-<process name>` (`queue_max-worker`), and lookups resolve each key on its
//! own: the process-specific value when present, the global value otherwise.

use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;

use crate::errors::{SharedError, SharedResult};
use crate::types::EventKind;

/// Name the relay runs under inside PM2; its own events are ignored
pub const DEFAULT_MODULE_NAME: &str = "pm2-slack-plus";
pub const DEFAULT_SLACK_PORT: u16 = 6666;
pub const DEFAULT_ECOSYSTEM_APP: &str = "app";
pub const DEFAULT_ECOSYSTEM_FILE: &str = "ecosystem.config.js";

/// Keys that may be supplied through the environment instead of the config file
pub const ENV_KEYS: &[&str] = &[
    "SLACK_BOT_TOKEN",
    "SLACK_PORT",
    "SLACK_ADMIN_USERS",
    "LOGS_PATH",
    "ECOSYSTEM_APP",
    "ECOSYSTEM_FILE",
];

/// Flat module configuration with per-process overrides
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleConfig {
    values: Map<String, Value>,
}

impl ModuleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON value, which must be an object
    pub fn from_value(value: Value) -> SharedResult<Self> {
        match value {
            Value::Object(values) => Ok(Self { values }),
            Value::Null => Ok(Self::default()),
            _ => Err(SharedError::ConfigShape {
                path: "<inline>".to_string(),
            }),
        }
    }

    /// Load a JSON config file. A missing file yields an empty configuration.
    pub fn load(path: &Path) -> SharedResult<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(SharedError::ConfigRead {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })
            }
        };

        match serde_json::from_str::<Value>(&raw)? {
            Value::Object(values) => Ok(Self { values }),
            _ => Err(SharedError::ConfigShape {
                path: path.display().to_string(),
            }),
        }
    }

    /// Set a key (fluent API)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Copy the environment-capable keys from `vars`, overriding the file
    pub fn apply_env_overrides<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if ENV_KEYS.contains(&key.as_str()) && !value.is_empty() {
                self.values.insert(key, Value::String(value));
            }
        }
    }

    /// Raw global value. `null` counts as absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    /// Value for `key` as seen by `process`: `key-process`, falling back to `key`
    pub fn get_for(&self, key: &str, process: &str) -> Option<&Value> {
        self.get(&format!("{key}-{process}")).or_else(|| self.get(key))
    }

    pub fn string_for(&self, key: &str, process: &str) -> Option<String> {
        self.get_for(key, process).and_then(as_string)
    }

    pub fn bool_for(&self, key: &str, process: &str) -> Option<bool> {
        self.get_for(key, process).and_then(as_bool)
    }

    pub fn u64_for(&self, key: &str, process: &str) -> Option<u64> {
        self.get_for(key, process).and_then(as_f64).filter(|n| *n >= 0.0).map(|n| n as u64)
    }

    /// Duration given in (possibly fractional) seconds
    pub fn seconds_for(&self, key: &str, process: &str) -> Option<Duration> {
        self.get_for(key, process)
            .and_then(as_f64)
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(Duration::from_secs_f64)
    }

    pub fn string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(as_string)
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(as_bool)
    }

    /// Whether notifications of `kind` are enabled for `process`
    pub fn event_enabled(&self, kind: EventKind, process: &str) -> bool {
        self.bool_for(kind.config_key(), process)
            .unwrap_or_else(|| default_enabled(kind))
    }

    pub fn module_name(&self) -> String {
        self.string("module_name").unwrap_or_else(|| DEFAULT_MODULE_NAME.to_string())
    }

    pub fn slack_bot_token(&self) -> Option<String> {
        self.string("SLACK_BOT_TOKEN")
    }

    pub fn slack_port(&self) -> SharedResult<u16> {
        match self.get("SLACK_PORT") {
            None => Ok(DEFAULT_SLACK_PORT),
            Some(value) => as_f64(value)
                .filter(|p| *p >= 1.0 && *p <= f64::from(u16::MAX))
                .map(|p| p as u16)
                .ok_or_else(|| SharedError::invalid("SLACK_PORT", value)),
        }
    }

    /// Slack user ids allowed to run mutating actions
    pub fn admin_users(&self) -> Vec<String> {
        self.string("SLACK_ADMIN_USERS")
            .map(|users| users.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn logs_path(&self) -> Option<String> {
        self.string("LOGS_PATH")
    }

    pub fn ecosystem_app(&self) -> String {
        self.string("ECOSYSTEM_APP").unwrap_or_else(|| DEFAULT_ECOSYSTEM_APP.to_string())
    }

    pub fn ecosystem_file(&self) -> String {
        self.string("ECOSYSTEM_FILE").unwrap_or_else(|| DEFAULT_ECOSYSTEM_FILE.to_string())
    }
}

fn default_enabled(kind: EventKind) -> bool {
    match kind {
        EventKind::Error
        | EventKind::Kill
        | EventKind::Exception
        | EventKind::Stop
        | EventKind::RestartOverlimit => true,
        EventKind::Log | EventKind::Start | EventKind::Online | EventKind::Restart | EventKind::Exit => false,
    }
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Some(true),
            "false" | "no" | "0" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
