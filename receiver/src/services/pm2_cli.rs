//! Process manager access through the `pm2` command line
//!
//! Each call runs one `pm2` invocation, which connects to the daemon,
//! performs the request and disconnects.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use shared::component_debug;
use shared::logging::ComponentId;

use crate::error::{ReceiverError, ReceiverResult};
use crate::traits::ProcessManager;
use crate::types::{EcosystemAction, ProcessAction, ProcessStatus};

/// Extract the process list from `pm2 jlist` output.
///
/// pm2 may print update notices or warnings before the JSON array, so
/// parsing starts at the first line beginning with `[`.
pub fn parse_jlist(output: &str) -> ReceiverResult<Vec<ProcessStatus>> {
    let start = if output.starts_with('[') {
        0
    } else {
        output
            .find("\n[")
            .map(|i| i + 1)
            .ok_or_else(|| ReceiverError::process_manager("no process list in pm2 output"))?
    };
    Ok(serde_json::from_str(output[start..].trim_end())?)
}

/// `ProcessManager` backed by the `pm2` executable
pub struct RealProcessManager {
    program: OsString,
    leading_args: Vec<OsString>,
}

impl RealProcessManager {
    pub fn new() -> Self {
        Self {
            program: OsString::from("pm2"),
            leading_args: Vec::new(),
        }
    }

    /// Run a different program, with `leading_args` placed before every pm2 argument list
    pub fn with_program<I, A>(program: impl Into<OsString>, leading_args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        Self {
            program: program.into(),
            leading_args: leading_args.into_iter().map(Into::into).collect(),
        }
    }

    async fn run(&self, args: &[&str], cwd: Option<&Path>) -> ReceiverResult<String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = cwd {
            cmd.current_dir(cwd);
        }

        component_debug!(ComponentId::Receiver, "Running pm2 {}", args.join(" "));
        let output = cmd
            .output()
            .await
            .map_err(|e| ReceiverError::process_manager(format!("failed to run pm2: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReceiverError::process_manager(format!(
                "pm2 {} exited with {}: {}",
                args.join(" "),
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for RealProcessManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessManager for RealProcessManager {
    async fn list_processes(&self) -> ReceiverResult<Vec<ProcessStatus>> {
        let output = self.run(&["jlist"], None).await?;
        parse_jlist(&output)
    }

    async fn describe_process(&self, id: &str) -> ReceiverResult<Option<ProcessStatus>> {
        let processes = self.list_processes().await?;
        Ok(processes.into_iter().find(|p| p.matches(id)))
    }

    async fn control_process(&self, action: ProcessAction, id: &str) -> ReceiverResult<()> {
        self.run(&[action.as_str(), id], None).await?;
        Ok(())
    }

    async fn run_ecosystem(&self, action: EcosystemAction, cwd: &Path, file: &str) -> ReceiverResult<()> {
        self.run(&[action.as_str(), file], Some(cwd)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_jlist_skips_preamble() {
        let output = ">>>> In-memory PM2 is out-of-date, do:\n>>>> $ pm2 update\n[{\"name\":\"api\",\"pm_id\":0}]\n";
        let processes = parse_jlist(output).unwrap();
        assert_eq!(processes.len(), 1);
        assert_eq!(processes[0].name, "api");
    }

    #[test]
    fn test_parse_jlist_empty_and_garbage() {
        assert!(parse_jlist("[]").unwrap().is_empty());
        assert!(parse_jlist("daemon not running").is_err());
    }
}
