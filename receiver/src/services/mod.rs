//! Service implementations
//!
//! Real implementations of the process manager and chat client traits.

pub mod pm2_cli;
pub mod slack_api;

#[cfg(test)]
pub mod tests;

pub use pm2_cli::RealProcessManager;
pub use slack_api::RealChatClient;
