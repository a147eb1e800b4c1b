//! Service implementations of the relay's I/O seams

pub mod amp;
#[cfg(unix)]
pub mod pm2_bus;
pub mod slack_webhook;

#[cfg(test)]
pub mod tests;

#[cfg(unix)]
pub use pm2_bus::RealPm2Bus;
pub use slack_webhook::RealSlackWebhook;
