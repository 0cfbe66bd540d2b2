//! View layer for bot UI components
//!
//! Contains keyboards, messages, and formatting for Telegram UI.

pub mod catalog;

pub use catalog::*;
