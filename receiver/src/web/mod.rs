//! HTTP surface of the command receiver

pub mod handlers;
