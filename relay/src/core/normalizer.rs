//! Event normalizer
//!
//! Turns tagged bus events into canonical [`Message`]s, dropping the ones the
//! relay must not forward: its own output, disabled event kinds and known
//! runtime noise.

use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};
use regex::Regex;
use serde_json::{json, Value};
use std::sync::{Arc, LazyLock};

use shared::{EventKind, ExceptionPayload, InboundEvent, Message, ModuleConfig, ProcessDescriptor};

/// Substring marking stderr noise that is never forwarded
const NOISE_MARKER: &str = "DeprecationWarning";

/// Name used for daemon-level events
const DAEMON_NAME: &str = "PM2";

// `YYYY-MM-DD hh:mm:ss[.mmm] ±hh:mm[:ss]` at the very start, then separators.
static LOG_DATE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^([0-9]{4})-([0-9]{2})-([0-9]{2}) ([0-9]{1,2}):([0-9]{2}):([0-9]{2})(?:\.([0-9]{3}))? ([+-]?)([0-9]{1,2}):([0-9]{2})(?::([0-9]{2})|\.[0-9]{3})?[:\-\s]+",
    )
    .expect("log date pattern is valid")
});

/// Description and embedded timestamp of a log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLog {
    pub description: String,
    pub timestamp: Option<i64>,
}

/// Strip a leading PM2 date prefix from `line`, returning its epoch seconds.
///
/// Lines without a complete prefix (or with an impossible date) are returned verbatim.
pub fn parse_log_line(line: &str) -> ParsedLog {
    let Some(captures) = LOG_DATE_PREFIX.captures(line) else {
        return ParsedLog {
            description: line.to_string(),
            timestamp: None,
        };
    };

    let num = |i: usize| -> Option<u32> { captures.get(i).and_then(|m| m.as_str().parse().ok()) };

    let timestamp = (|| {
        let year = captures.get(1)?.as_str().parse::<i32>().ok()?;
        let date = NaiveDate::from_ymd_opt(year, num(2)?, num(3)?)?;
        let millis = num(7).unwrap_or(0);
        let local = date.and_hms_milli_opt(num(4)?, num(5)?, num(6)?, millis)?;

        let offset_secs = (num(9)? * 3600 + num(10)? * 60 + num(11).unwrap_or(0)) as i32;
        let offset = if captures.get(8).map(|m| m.as_str()) == Some("-") {
            FixedOffset::west_opt(offset_secs)?
        } else {
            FixedOffset::east_opt(offset_secs)?
        };

        Some(offset.from_local_datetime(&local).single()?.timestamp())
    })();

    match (timestamp, captures.get(0)) {
        (Some(timestamp), Some(prefix)) => ParsedLog {
            description: line[prefix.end()..].to_string(),
            timestamp: Some(timestamp),
        },
        _ => ParsedLog {
            description: line.to_string(),
            timestamp: None,
        },
    }
}

/// Fixed human-readable description of a lifecycle transition
pub fn lifecycle_description(kind: EventKind, process_name: &str) -> Option<String> {
    match kind {
        EventKind::Start | EventKind::Online => Some(format!("{process_name} started")),
        EventKind::Stop => Some("App stopped.".to_string()),
        EventKind::Restart => Some("App restarted.".to_string()),
        EventKind::Exit => Some("App closed.".to_string()),
        EventKind::RestartOverlimit => Some("Process has been stopped. Check and fix the issue.".to_string()),
        _ => None,
    }
}

/// Buttons attached to lifecycle notifications. The button value is the PM2
/// process name the action applies to.
pub fn lifecycle_actions(kind: EventKind, process_name: &str) -> Vec<Value> {
    match kind {
        EventKind::Start | EventKind::Online => vec![
            json!({
                "name": "reload",
                "text": "Reload",
                "type": "button",
                "style": "primary",
                "value": process_name,
            }),
            json!({
                "name": "stop",
                "text": "Stop",
                "type": "button",
                "style": "danger",
                "value": process_name,
            }),
        ],
        EventKind::Stop => vec![json!({
            "name": "start",
            "text": "Start",
            "type": "button",
            "value": process_name,
        })],
        _ => Vec::new(),
    }
}

fn exception_description(payload: &ExceptionPayload) -> String {
    match payload {
        ExceptionPayload::Structured { code: Some(code), message } => format!("{code}: {message}"),
        ExceptionPayload::Structured { code: None, message } => message.clone(),
        ExceptionPayload::Opaque(value) => value.to_string(),
    }
}

/// Converts inbound events into canonical messages
#[derive(Debug, Clone)]
pub struct Normalizer {
    config: Arc<ModuleConfig>,
    module_name: String,
}

impl Normalizer {
    pub fn new(config: Arc<ModuleConfig>) -> Self {
        let module_name = config.module_name();
        Self { config, module_name }
    }

    /// Normalize using the current wall clock as the default timestamp
    pub fn normalize(&self, event: InboundEvent) -> Option<Message> {
        self.normalize_at(event, Utc::now().timestamp())
    }

    /// Normalize with `now` (epoch seconds) as the default timestamp
    pub fn normalize_at(&self, event: InboundEvent, now: i64) -> Option<Message> {
        if event.process().is_some_and(|p| self.is_self(p)) {
            return None;
        }

        match event {
            InboundEvent::LogOut { process, data } => self.log_message(EventKind::Log, &process, &data, now),
            InboundEvent::LogErr { process, data } => {
                if data.contains(NOISE_MARKER) {
                    return None;
                }
                self.log_message(EventKind::Error, &process, &data, now)
            }
            InboundEvent::Lifecycle { process, event } => {
                let kind = EventKind::from_lifecycle(&event)?;
                let process_name = process.display_name();
                if !self.config.event_enabled(kind, &process_name) {
                    return None;
                }
                Some(Message {
                    process_name,
                    event_kind: kind,
                    description: lifecycle_description(kind, &process.name),
                    timestamp: now,
                    interactive: lifecycle_actions(kind, &process.name),
                })
            }
            InboundEvent::Exception { process, data } => {
                let process_name = process.display_name();
                if !self.config.event_enabled(EventKind::Exception, &process_name) {
                    return None;
                }
                Some(Message {
                    process_name,
                    event_kind: EventKind::Exception,
                    description: Some(exception_description(&data)),
                    timestamp: now,
                    interactive: Vec::new(),
                })
            }
            InboundEvent::Kill { msg } => {
                if !self.config.event_enabled(EventKind::Kill, DAEMON_NAME) {
                    return None;
                }
                Some(Message {
                    process_name: DAEMON_NAME.to_string(),
                    event_kind: EventKind::Kill,
                    description: Some(msg),
                    timestamp: now,
                    interactive: Vec::new(),
                })
            }
        }
    }

    fn is_self(&self, process: &ProcessDescriptor) -> bool {
        process.name == self.module_name
    }

    fn log_message(&self, kind: EventKind, process: &ProcessDescriptor, data: &str, now: i64) -> Option<Message> {
        let process_name = process.display_name();
        if !self.config.event_enabled(kind, &process_name) {
            return None;
        }
        let parsed = parse_log_line(data);
        Some(Message {
            process_name,
            event_kind: kind,
            description: Some(parsed.description),
            timestamp: parsed.timestamp.unwrap_or(now),
            interactive: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::config::DEFAULT_MODULE_NAME;

    const NOW: i64 = 1_700_000_000;

    fn normalizer(config: ModuleConfig) -> Normalizer {
        Normalizer::new(Arc::new(config))
    }

    fn all_enabled() -> ModuleConfig {
        ModuleConfig::new()
            .with("log", true)
            .with("error", true)
            .with("start", true)
            .with("online", true)
            .with("restart", true)
            .with("exit", true)
    }

    #[test]
    fn test_parse_log_line_with_date_prefix() {
        let parsed = parse_log_line("2024-01-15 10:30:00 +00:00: worker crashed");
        assert_eq!(parsed.description, "worker crashed");
        assert_eq!(parsed.timestamp, Some(1_705_314_600));
    }

    #[test]
    fn test_parse_log_line_offsets_and_millis() {
        let parsed = parse_log_line("2024-01-15 12:30:00.250 +02:00 - listening");
        assert_eq!(parsed.description, "listening");
        assert_eq!(parsed.timestamp, Some(1_705_314_600));

        let parsed = parse_log_line("2024-01-15 5:30:00 -05:00:  late shift");
        assert_eq!(parsed.description, "late shift");
        assert_eq!(parsed.timestamp, Some(1_705_314_600));
    }

    #[test]
    fn test_parse_log_line_rejects_partial_prefix() {
        for line in [
            "2024-01-15 10:30:00: missing timezone",
            "2024-01-15: date only",
            "worker crashed at 2024-01-15 10:30:00 +00:00: later",
            "2024-01-15 10:30:00 +00:00",
        ] {
            let parsed = parse_log_line(line);
            assert_eq!(parsed.description, line);
            assert_eq!(parsed.timestamp, None);
        }
    }

    #[test]
    fn test_parse_log_line_rejects_impossible_date() {
        let line = "2024-13-45 10:30:00 +00:00: nonsense";
        let parsed = parse_log_line(line);
        assert_eq!(parsed.description, line);
        assert_eq!(parsed.timestamp, None);
    }

    #[test]
    fn test_log_event_uses_embedded_or_current_time() {
        let n = normalizer(all_enabled());

        let dated = n
            .normalize_at(
                InboundEvent::LogOut {
                    process: ProcessDescriptor::named("worker"),
                    data: "2024-01-15 10:30:00 +00:00: worker crashed".to_string(),
                },
                NOW,
            )
            .unwrap();
        assert_eq!(dated.event_kind, EventKind::Log);
        assert_eq!(dated.description.as_deref(), Some("worker crashed"));
        assert_eq!(dated.timestamp, 1_705_314_600);

        let plain = n
            .normalize_at(
                InboundEvent::LogErr {
                    process: ProcessDescriptor::named("worker"),
                    data: "plain failure".to_string(),
                },
                NOW,
            )
            .unwrap();
        assert_eq!(plain.event_kind, EventKind::Error);
        assert_eq!(plain.description.as_deref(), Some("plain failure"));
        assert_eq!(plain.timestamp, NOW);
    }

    #[test]
    fn test_deprecation_noise_is_dropped() {
        let n = normalizer(all_enabled());
        let event = InboundEvent::LogErr {
            process: ProcessDescriptor::named("worker"),
            data: "(node:123) [DEP0005] DeprecationWarning: Buffer() is deprecated".to_string(),
        };
        assert!(n.normalize_at(event, NOW).is_none());
    }

    #[test]
    fn test_own_process_is_ignored() {
        let n = normalizer(all_enabled());
        for event in [
            InboundEvent::LogOut {
                process: ProcessDescriptor::named(DEFAULT_MODULE_NAME),
                data: "relay output".to_string(),
            },
            InboundEvent::Lifecycle {
                process: ProcessDescriptor::named(DEFAULT_MODULE_NAME),
                event: "online".to_string(),
            },
        ] {
            assert!(n.normalize_at(event, NOW).is_none());
        }

        let renamed = normalizer(all_enabled().with("module_name", "relay"));
        let event = InboundEvent::LogOut {
            process: ProcessDescriptor::named(DEFAULT_MODULE_NAME),
            data: "someone else".to_string(),
        };
        assert!(renamed.normalize_at(event, NOW).is_some());
    }

    #[test]
    fn test_disabled_kinds_are_filtered() {
        let n = normalizer(ModuleConfig::new().with("error", false));

        let log = InboundEvent::LogOut {
            process: ProcessDescriptor::named("api"),
            data: "hello".to_string(),
        };
        assert!(n.normalize_at(log, NOW).is_none(), "log is disabled by default");

        let err = InboundEvent::LogErr {
            process: ProcessDescriptor::named("api"),
            data: "boom".to_string(),
        };
        assert!(n.normalize_at(err, NOW).is_none());

        let online = InboundEvent::Lifecycle {
            process: ProcessDescriptor::named("api"),
            event: "online".to_string(),
        };
        assert!(n.normalize_at(online, NOW).is_none(), "online is disabled by default");

        let stop = InboundEvent::Lifecycle {
            process: ProcessDescriptor::named("api"),
            event: "stop".to_string(),
        };
        assert!(n.normalize_at(stop, NOW).is_some(), "stop is enabled by default");
    }

    #[test]
    fn test_lifecycle_descriptions_and_actions() {
        let n = normalizer(all_enabled());
        let clustered = ProcessDescriptor {
            name: "api".to_string(),
            exec_mode: Some("cluster_mode".to_string()),
            instances: Some(2),
            pm_id: Some(3),
            pm_cwd: None,
        };

        let online = n
            .normalize_at(
                InboundEvent::Lifecycle {
                    process: clustered.clone(),
                    event: "online".to_string(),
                },
                NOW,
            )
            .unwrap();
        assert_eq!(online.process_name, "api[3]");
        assert_eq!(online.event_kind, EventKind::Online);
        assert_eq!(online.description.as_deref(), Some("api started"));
        assert_eq!(online.interactive.len(), 2);
        assert_eq!(online.interactive[0]["text"], "Reload");
        assert_eq!(online.interactive[1]["text"], "Stop");
        assert_eq!(online.interactive[0]["value"], "api");

        let stop = n
            .normalize_at(
                InboundEvent::Lifecycle {
                    process: clustered.clone(),
                    event: "stop".to_string(),
                },
                NOW,
            )
            .unwrap();
        assert_eq!(stop.description.as_deref(), Some("App stopped."));
        assert_eq!(stop.interactive.len(), 1);
        assert_eq!(stop.interactive[0]["text"], "Start");

        let overlimit = n
            .normalize_at(
                InboundEvent::Lifecycle {
                    process: clustered,
                    event: "restart overlimit".to_string(),
                },
                NOW,
            )
            .unwrap();
        assert_eq!(overlimit.event_kind, EventKind::RestartOverlimit);
        assert!(overlimit.interactive.is_empty());
    }

    #[test]
    fn test_unknown_lifecycle_subtype_is_dropped() {
        let n = normalizer(all_enabled().with("delete", true));
        let event = InboundEvent::Lifecycle {
            process: ProcessDescriptor::named("api"),
            event: "delete".to_string(),
        };
        assert!(n.normalize_at(event, NOW).is_none());
    }

    #[test]
    fn test_exception_descriptions() {
        let n = normalizer(ModuleConfig::new());

        let structured = n
            .normalize_at(
                InboundEvent::Exception {
                    process: ProcessDescriptor::named("api"),
                    data: ExceptionPayload::Structured {
                        code: Some("ECONNRESET".to_string()),
                        message: "socket hang up".to_string(),
                    },
                },
                NOW,
            )
            .unwrap();
        assert_eq!(structured.description.as_deref(), Some("ECONNRESET: socket hang up"));

        let opaque = n
            .normalize_at(
                InboundEvent::Exception {
                    process: ProcessDescriptor::named("api"),
                    data: ExceptionPayload::Opaque(json!({"reason": 42})),
                },
                NOW,
            )
            .unwrap();
        assert_eq!(opaque.description.as_deref(), Some(r#"{"reason":42}"#));
        assert_eq!(opaque.timestamp, NOW);
    }

    #[test]
    fn test_kill_event_uses_daemon_name() {
        let n = normalizer(ModuleConfig::new());
        let message = n
            .normalize_at(
                InboundEvent::Kill {
                    msg: "pm2 has been killed by signal".to_string(),
                },
                NOW,
            )
            .unwrap();
        assert_eq!(message.process_name, "PM2");
        assert_eq!(message.event_kind, EventKind::Kill);
        assert_eq!(message.description.as_deref(), Some("pm2 has been killed by signal"));
    }

    #[test]
    fn test_event_toggles_resolve_per_process() {
        let n = normalizer(all_enabled().with("error-worker", false).with("kill-PM2", false));

        let from = |name: &str| InboundEvent::LogErr {
            process: ProcessDescriptor::named(name),
            data: "boom".to_string(),
        };
        assert!(n.normalize_at(from("worker"), NOW).is_none());
        assert!(n.normalize_at(from("api"), NOW).is_some());

        let kill = InboundEvent::Kill {
            msg: "pm2 has been killed by signal".to_string(),
        };
        assert!(n.normalize_at(kill, NOW).is_none());
    }
}
