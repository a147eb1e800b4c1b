//! Core types used throughout the relay
//!
//! `InboundEvent` is the tagged form of a PM2 bus packet, `Message` is the
//! canonical value every downstream stage works with.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use crate::errors::SharedResult;

/// Interactive UI-action descriptor (a Slack attachment action), passed through unmodified
pub type InteractiveAction = Value;

/// Kind of a canonical message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    Start,
    Online,
    Stop,
    Restart,
    Exit,
    Error,
    Log,
    Exception,
    RestartOverlimit,
    Kill,
}

impl EventKind {
    /// Map a `process:event` subtype onto a kind
    pub fn from_lifecycle(event: &str) -> Option<Self> {
        match event {
            "start" => Some(EventKind::Start),
            "online" => Some(EventKind::Online),
            "stop" => Some(EventKind::Stop),
            "restart" => Some(EventKind::Restart),
            "exit" => Some(EventKind::Exit),
            "restart overlimit" => Some(EventKind::RestartOverlimit),
            _ => None,
        }
    }

    /// Name of the boolean configuration key enabling this kind
    pub fn config_key(&self) -> &'static str {
        match self {
            EventKind::Start => "start",
            EventKind::Online => "online",
            EventKind::Stop => "stop",
            EventKind::Restart => "restart",
            EventKind::Exit => "exit",
            EventKind::Error => "error",
            EventKind::Log => "log",
            EventKind::Exception => "exception",
            EventKind::RestartOverlimit => "restart overlimit",
            EventKind::Kill => "kill",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_key())
    }
}

/// Canonical notification message, created by the normalizer and never mutated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub process_name: String,
    pub event_kind: EventKind,
    pub description: Option<String>,
    /// Seconds since the Unix epoch
    pub timestamp: i64,
    #[serde(default)]
    pub interactive: Vec<InteractiveAction>,
}

/// Source process descriptor as carried by bus packets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessDescriptor {
    pub name: String,
    #[serde(default)]
    pub exec_mode: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub instances: Option<u32>,
    #[serde(default)]
    pub pm_id: Option<u32>,
    #[serde(default)]
    pub pm_cwd: Option<String>,
}

impl ProcessDescriptor {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn is_clustered(&self) -> bool {
        self.exec_mode.as_deref() == Some("cluster_mode") && self.instances.unwrap_or(0) > 1
    }

    /// Name suffixed with `[pm_id]` for multi-instance cluster processes
    pub fn display_name(&self) -> String {
        match (self.is_clustered(), self.pm_id) {
            (true, Some(pm_id)) => format!("{}[{}]", self.name, pm_id),
            _ => self.name.clone(),
        }
    }
}

// PM2 keeps `instances` as configured, which may be a number, a numeric string or "max".
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Payload of a `process:exception` packet
#[derive(Debug, Clone, PartialEq)]
pub enum ExceptionPayload {
    /// An error object with a message and optional code
    Structured { code: Option<String>, message: String },
    /// Anything else, kept as raw JSON
    Opaque(Value),
}

impl From<Value> for ExceptionPayload {
    fn from(value: Value) -> Self {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        match message {
            Some(message) => {
                let code = match value.get("code") {
                    Some(Value::String(code)) if !code.is_empty() => Some(code.clone()),
                    Some(Value::Number(code)) => Some(code.to_string()),
                    _ => None,
                };
                ExceptionPayload::Structured { code, message }
            }
            None => ExceptionPayload::Opaque(value),
        }
    }
}

/// Inbound PM2 bus event, one variant per topic
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// `log:out`
    LogOut { process: ProcessDescriptor, data: String },
    /// `log:err`
    LogErr { process: ProcessDescriptor, data: String },
    /// `process:event`, with the raw subtype (`start`, `online`, `restart overlimit`, ...)
    Lifecycle { process: ProcessDescriptor, event: String },
    /// `process:exception`
    Exception { process: ProcessDescriptor, data: ExceptionPayload },
    /// `pm2:kill`
    Kill { msg: String },
}

#[derive(Deserialize)]
struct LogPacket {
    process: ProcessDescriptor,
    #[serde(default)]
    data: String,
}

#[derive(Deserialize)]
struct LifecyclePacket {
    process: ProcessDescriptor,
    event: String,
}

#[derive(Deserialize)]
struct ExceptionPacket {
    process: ProcessDescriptor,
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize)]
struct KillPacket {
    #[serde(default)]
    msg: String,
}

impl InboundEvent {
    /// Build an event from a bus topic and its JSON packet.
    ///
    /// Returns `Ok(None)` for topics the relay does not consume.
    pub fn from_bus(topic: &str, packet: Value) -> SharedResult<Option<Self>> {
        let event = match topic {
            "log:out" => {
                let p: LogPacket = serde_json::from_value(packet)?;
                InboundEvent::LogOut {
                    process: p.process,
                    data: p.data,
                }
            }
            "log:err" => {
                let p: LogPacket = serde_json::from_value(packet)?;
                InboundEvent::LogErr {
                    process: p.process,
                    data: p.data,
                }
            }
            "process:event" => {
                let p: LifecyclePacket = serde_json::from_value(packet)?;
                InboundEvent::Lifecycle {
                    process: p.process,
                    event: p.event,
                }
            }
            "process:exception" => {
                let p: ExceptionPacket = serde_json::from_value(packet)?;
                InboundEvent::Exception {
                    process: p.process,
                    data: ExceptionPayload::from(p.data),
                }
            }
            "pm2:kill" | "kill" => {
                let p: KillPacket = serde_json::from_value(packet)?;
                InboundEvent::Kill { msg: p.msg }
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    pub fn topic(&self) -> &'static str {
        match self {
            InboundEvent::LogOut { .. } => "log:out",
            InboundEvent::LogErr { .. } => "log:err",
            InboundEvent::Lifecycle { .. } => "process:event",
            InboundEvent::Exception { .. } => "process:exception",
            InboundEvent::Kill { .. } => "pm2:kill",
        }
    }

    /// Source process, absent for daemon-level events
    pub fn process(&self) -> Option<&ProcessDescriptor> {
        match self {
            InboundEvent::LogOut { process, .. }
            | InboundEvent::LogErr { process, .. }
            | InboundEvent::Lifecycle { process, .. }
            | InboundEvent::Exception { process, .. } => Some(process),
            InboundEvent::Kill { .. } => None,
        }
    }
}
