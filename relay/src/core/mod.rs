//! Core relay logic: normalization, routing and batching

pub mod format;
pub mod normalizer;
pub mod queue;
pub mod router;

pub use normalizer::Normalizer;
pub use queue::MessageQueue;
pub use router::{DestinationConfig, DestinationResolver, DestinationRouter};
