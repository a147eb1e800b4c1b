//! Command handling core

pub mod commands;
pub mod dispatch;
pub mod process_control;

pub use commands::TextCommand;
pub use dispatch::CommandHandler;
pub use process_control::ProcessControl;
