//! Telegram catalog bot for the «Я тебя слышу» hearing guide.
//!
//! Users browse a menu tree served by the content service, open materials,
//! search, ask questions and rate what they read. Inactive users get
//! periodic reminders.

#![deny(missing_docs)]

/// Usage telemetry and user registration
pub mod activity;
/// Content service client
pub mod api;
/// Telegram adapter
pub mod bot;
/// Outbound channel abstraction
pub mod channel;
/// Configuration
pub mod config;
/// Content rendering and delivery
pub mod content;
/// Menu tree lookups
pub mod navigator;
/// Re-engagement reminders
pub mod reminder;
/// Catalog search
pub mod search;
/// Conversation state machine
pub mod session;
/// Text helpers
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
