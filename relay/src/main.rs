//! Main entry point for the relay binary
//!
//! Wires the PM2 bus source and the Slack webhook sink into the relay, and
//! boots the chat command receiver when a bot token is configured.

use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;

use receiver::services::{RealChatClient, RealProcessManager};
use receiver::{ProcessControl, Receiver};
use relay::services::{RealPm2Bus, RealSlackWebhook};
use relay::Relay;
use shared::logging::{self, ComponentId};
use shared::{component_debug, component_info, ModuleConfig};

/// Relays PM2 process events to Slack
#[derive(Parser)]
#[command(name = "pm2-slack-relay")]
#[command(about = "Forwards PM2 logs and lifecycle events to Slack and serves chat commands")]
pub struct Args {
    /// Module configuration file (flat JSON object)
    #[arg(long, default_value = "./pm2-slack.json")]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// PM2 home directory holding pub.sock (defaults to $PM2_HOME or ~/.pm2)
    #[arg(long)]
    pub pm2_home: Option<PathBuf>,

    /// Do not start the chat command receiver
    #[arg(long)]
    pub no_receiver: bool,
}

fn default_pm2_home() -> PathBuf {
    if let Some(home) = std::env::var_os("PM2_HOME") {
        return PathBuf::from(home);
    }
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_default()
        .join(".pm2")
}

fn load_config(path: &Path) -> anyhow::Result<ModuleConfig> {
    let mut config = ModuleConfig::load(path).with_context(|| format!("loading {}", path.display()))?;
    config.apply_env_overrides(std::env::vars());
    Ok(config)
}

async fn start_receiver(config: Arc<ModuleConfig>, token: String) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.slack_port()?));
    let self_exe = std::env::current_exe().context("resolving own executable")?;

    let control = ProcessControl::new(RealProcessManager::new(), self_exe);
    let chat = RealChatClient::new(token)?;
    let receiver = Receiver::new(config, control, chat);

    tokio::spawn(async move {
        if let Err(e) = receiver.run(addr).await {
            logging::log_error(ComponentId::Receiver, "Command receiver", &e);
        }
    });
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let _ = dotenv::dotenv();
    logging::init_tracing_with_level(Some(&args.log_level));
    logging::log_startup(ComponentId::Relay, "PM2 → Slack relay");

    let config = Arc::new(load_config(&args.config)?);
    component_debug!(ComponentId::Relay, "Loaded configuration from {}", args.config.display());

    match config.slack_bot_token() {
        Some(token) if !args.no_receiver => start_receiver(config.clone(), token).await?,
        Some(_) => component_info!(ComponentId::Relay, "Command receiver disabled"),
        None => component_info!(ComponentId::Relay, "No SLACK_BOT_TOKEN set, command receiver not started"),
    }

    let pm2_home = args.pm2_home.clone().unwrap_or_else(default_pm2_home);
    let source = RealPm2Bus::new(&pm2_home);
    component_info!(ComponentId::Relay, "📡 Subscribing to PM2 bus at {}", source.socket_path().display());
    let sink = RealSlackWebhook::new()?;
    let mut relay = Relay::new(config, source, sink);

    // Set up graceful shutdown
    let shutdown_sender = relay.get_shutdown_sender();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                logging::log_shutdown(ComponentId::Relay, "Received Ctrl+C signal");
                let _ = shutdown_sender.send(()).await;
            }
            Err(err) => {
                logging::log_error(ComponentId::Relay, "Signal handling", &err);
            }
        }
    });

    relay.run().await?;

    logging::log_success(ComponentId::Relay, "Relay stopped gracefully");
    Ok(())
}
