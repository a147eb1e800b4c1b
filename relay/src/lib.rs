//! PM2 → Slack relay
//!
//! Listens to the PM2 event bus, turns process events into chat messages and
//! delivers them to per-process Slack destinations in batches.

pub mod core;
pub mod error;
pub mod relay;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use crate::core::{DestinationConfig, DestinationResolver, DestinationRouter, MessageQueue, Normalizer};
pub use error::{RelayError, RelayResult};
pub use relay::Relay;
pub use traits::{EventSource, NotificationSink};
