//! Outbound message channel
//!
//! The session engine, the content dispatcher and the reminder scheduler talk
//! to users only through [`Channel`]. Production uses the Telegram
//! implementation in [`crate::bot::telegram`].

use async_trait::async_trait;
use teloxide::types::InlineKeyboardMarkup;
use thiserror::Error;

/// Where a rendered message goes: a fresh message, or an edit of `message_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    /// Chat to write to
    pub chat_id: i64,
    /// Message to replace, `None` sends a new one
    pub message_id: Option<i32>,
}

impl Target {
    /// Send a new message
    #[must_use]
    pub const fn fresh(chat_id: i64) -> Self {
        Self {
            chat_id,
            message_id: None,
        }
    }

    /// Replace an existing message
    #[must_use]
    pub const fn edit(chat_id: i64, message_id: i32) -> Self {
        Self {
            chat_id,
            message_id: Some(message_id),
        }
    }
}

/// Options of a text message
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageOptions {
    /// Inline keyboard under the message
    pub keyboard: Option<InlineKeyboardMarkup>,
    /// Show the link preview
    pub show_preview: bool,
}

impl MessageOptions {
    /// Keyboard, preview hidden
    #[must_use]
    pub const fn with_keyboard(keyboard: InlineKeyboardMarkup) -> Self {
        Self {
            keyboard: Some(keyboard),
            show_preview: false,
        }
    }
}

/// Kind of a stored Telegram file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Photo
    Photo,
    /// Video
    Video,
    /// Any other file
    Document,
}

/// A media message referencing an already uploaded file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    /// Photo, video or document
    pub kind: MediaKind,
    /// Telegram file id
    pub file_id: String,
    /// Caption, already escaped, may be empty
    pub caption: String,
}

/// Errors of the outbound channel
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    /// The platform refused the request (bad edit, blocked bot, ...)
    #[error("Channel rejected request: {0}")]
    Rejected(String),
    /// The request did not reach the platform
    #[error("Channel transport error: {0}")]
    Transport(String),
}

/// Outbound side of the conversation. Text is Telegram HTML.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Send a text message, returns its id
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        options: &MessageOptions,
    ) -> Result<i32, ChannelError>;

    /// Replace the text and keyboard of a message
    async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        options: &MessageOptions,
    ) -> Result<(), ChannelError>;

    /// Send a media message, returns its id
    async fn send_media(
        &self,
        chat_id: i64,
        media: &Media,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<i32, ChannelError>;

    /// Replace a message with a media message in place
    async fn edit_media(
        &self,
        chat_id: i64,
        message_id: i32,
        media: &Media,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<(), ChannelError>;

    /// Acknowledge a button press, optionally with an alert popup
    async fn answer_action(&self, action_id: &str, alert: Option<String>) -> Result<(), ChannelError>;
}

/// Edit the target message if there is one, send a new message otherwise.
///
/// An edit the platform refuses (for example text over a photo) falls back to
/// a fresh message. Returns the id of the message now showing `text`.
///
/// # Errors
///
/// Returns the channel error of the last attempt.
pub async fn show_text(
    channel: &dyn Channel,
    target: Target,
    text: &str,
    options: &MessageOptions,
) -> Result<i32, ChannelError> {
    if let Some(message_id) = target.message_id {
        match channel
            .edit_text(target.chat_id, message_id, text, options)
            .await
        {
            Ok(()) => return Ok(message_id),
            Err(ChannelError::Rejected(reason)) => {
                tracing::debug!(
                    chat_id = target.chat_id,
                    message_id = message_id,
                    reason = %reason,
                    "Text edit rejected, sending a new message"
                );
            }
            Err(e) => return Err(e),
        }
    }
    channel.send_text(target.chat_id, text, options).await
}
