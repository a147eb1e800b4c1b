//! Tests for the receiver services
//!
//! The pm2 client runs against a shell script standing in for the pm2
//! executable; the chat client runs against a wiremock server.

pub mod slack_api;
