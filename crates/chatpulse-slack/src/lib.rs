//! Slack Web API client for ChatPulse.
//!
//! Implements [`chatpulse_core::ChatPlatform`] over the `users.list`,
//! `channels.*` and `groups.*` methods.

pub mod client;
mod responses;

pub use client::SlackClient;
