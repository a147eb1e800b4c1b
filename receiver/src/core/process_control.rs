//! Process control with the self-restart guard
//!
//! The relay may itself run under the process manager. Any action that would
//! stop or restart it is refused before the process manager is asked to act.

use std::path::{Path, PathBuf};

use shared::component_info;
use shared::logging::ComponentId;

use crate::error::{ReceiverError, ReceiverResult};
use crate::traits::ProcessManager;
use crate::types::{EcosystemAction, ProcessAction, ProcessStatus};

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Wraps a `ProcessManager` with lookups and guarded mutations
pub struct ProcessControl<P>
where
    P: ProcessManager,
{
    manager: P,
    self_exe: PathBuf,
}

impl<P> ProcessControl<P>
where
    P: ProcessManager,
{
    /// `self_exe` is the running relay's executable path
    pub fn new(manager: P, self_exe: impl Into<PathBuf>) -> Self {
        Self {
            manager,
            self_exe: canonical(&self_exe.into()),
        }
    }

    pub async fn list(&self) -> ReceiverResult<Vec<ProcessStatus>> {
        self.manager.list_processes().await
    }

    pub async fn describe(&self, id: &str) -> ReceiverResult<Option<ProcessStatus>> {
        self.manager.describe_process(id).await
    }

    /// Whether `status` describes the running relay
    pub fn is_self(&self, status: &ProcessStatus) -> bool {
        status
            .pm2_env
            .pm_exec_path
            .as_deref()
            .is_some_and(|exec_path| canonical(Path::new(exec_path)) == self.self_exe)
    }

    async fn existing(&self, id: &str) -> ReceiverResult<ProcessStatus> {
        self.describe(id).await?.ok_or_else(|| ReceiverError::not_running(id))
    }

    /// Restart `id`, refusing when it is the relay itself
    pub async fn restart(&self, id: &str) -> ReceiverResult<ProcessStatus> {
        self.guarded(ProcessAction::Restart, id).await
    }

    /// Stop `id`, refusing when it is the relay itself
    pub async fn stop(&self, id: &str) -> ReceiverResult<ProcessStatus> {
        self.guarded(ProcessAction::Stop, id).await
    }

    pub async fn start(&self, id: &str) -> ReceiverResult<ProcessStatus> {
        let status = self.existing(id).await?;
        self.manager.control_process(ProcessAction::Start, id).await?;
        component_info!(ComponentId::Receiver, "▶️ Started {}", status.name);
        Ok(status)
    }

    async fn guarded(&self, action: ProcessAction, id: &str) -> ReceiverResult<ProcessStatus> {
        let status = self.existing(id).await?;
        if self.is_self(&status) {
            return Err(ReceiverError::SelfRestart { target: status.name });
        }

        self.manager.control_process(action, id).await?;
        component_info!(ComponentId::Receiver, "🔁 {} {}", action, status.name);
        Ok(status)
    }

    /// Reload or stop the ecosystem file from the working directory of `app`
    pub async fn run_ecosystem(&self, action: EcosystemAction, app: &str, file: &str) -> ReceiverResult<()> {
        let status = self.existing(app).await?;
        let cwd = status
            .pm2_env
            .pm_cwd
            .as_deref()
            .ok_or_else(|| ReceiverError::process_manager(format!("{app} has no working directory")))?;

        self.manager.run_ecosystem(action, Path::new(cwd), file).await?;
        component_info!(ComponentId::Receiver, "🌐 Ecosystem {} from {}", action, cwd);
        Ok(())
    }
}
