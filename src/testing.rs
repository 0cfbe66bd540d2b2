//! Testing helpers: a recording channel and canned catalog data.

use crate::api::models::{ItemType, MenuNode, RawContentItem};
use crate::channel::{Channel, ChannelError, Media, MessageOptions};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Mutex;
use teloxide::types::InlineKeyboardMarkup;

/// One call made on [`RecordingChannel`]
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SendText {
        chat_id: i64,
        text: String,
        options: MessageOptions,
    },
    EditText {
        chat_id: i64,
        message_id: i32,
        text: String,
        options: MessageOptions,
    },
    SendMedia {
        chat_id: i64,
        media: Media,
        keyboard: Option<InlineKeyboardMarkup>,
    },
    EditMedia {
        chat_id: i64,
        message_id: i32,
        media: Media,
        keyboard: Option<InlineKeyboardMarkup>,
    },
    Answer {
        action_id: String,
        alert: Option<String>,
    },
}

impl Call {
    /// Text of a text send or edit
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::SendText { text, .. } | Self::EditText { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Chat the call went to, `None` for answers
    pub const fn chat_id(&self) -> Option<i64> {
        match self {
            Self::SendText { chat_id, .. }
            | Self::EditText { chat_id, .. }
            | Self::SendMedia { chat_id, .. }
            | Self::EditMedia { chat_id, .. } => Some(*chat_id),
            Self::Answer { .. } => None,
        }
    }
}

/// Channel that records every call and fails on demand
#[derive(Default)]
pub struct RecordingChannel {
    calls: Mutex<Vec<Call>>,
    next_id: AtomicI32,
    reject_media_edits: bool,
    failing_files: HashSet<String>,
    failing_chats: HashSet<i64>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every in-place media edit
    pub fn rejecting_media_edits(mut self) -> Self {
        self.reject_media_edits = true;
        self
    }

    /// Fail every send of this file id
    pub fn failing_file(mut self, file_id: &str) -> Self {
        self.failing_files.insert(file_id.to_string());
        self
    }

    /// Fail every message to this chat
    pub fn failing_chat(mut self, chat_id: i64) -> Self {
        self.failing_chats.insert(chat_id);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Texts of all text sends and edits, in order
    pub fn texts(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter_map(|c| c.text().map(ToString::to_string))
            .collect()
    }

    /// Alert texts of all answered actions
    pub fn alerts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Answer { alert, .. } => alert,
                _ => None,
            })
            .collect()
    }

    /// Keyboard of the last text or media message
    pub fn last_keyboard(&self) -> Option<InlineKeyboardMarkup> {
        self.calls().into_iter().rev().find_map(|c| match c {
            Call::SendText { options, .. } | Call::EditText { options, .. } => options.keyboard,
            Call::SendMedia { keyboard, .. } | Call::EditMedia { keyboard, .. } => keyboard,
            Call::Answer { .. } => None,
        })
    }

    fn record(&self, call: Call) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn next_id(&self) -> i32 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 100
    }

    fn check_chat(&self, chat_id: i64) -> Result<(), ChannelError> {
        if self.failing_chats.contains(&chat_id) {
            return Err(ChannelError::Rejected("Forbidden: bot was blocked by the user".into()));
        }
        Ok(())
    }

    fn check_media(&self, chat_id: i64, media: &Media) -> Result<(), ChannelError> {
        self.check_chat(chat_id)?;
        if self.failing_files.contains(&media.file_id) {
            return Err(ChannelError::Transport("connection reset".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        options: &MessageOptions,
    ) -> Result<i32, ChannelError> {
        self.record(Call::SendText {
            chat_id,
            text: text.to_string(),
            options: options.clone(),
        });
        self.check_chat(chat_id)?;
        Ok(self.next_id())
    }

    async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        options: &MessageOptions,
    ) -> Result<(), ChannelError> {
        self.record(Call::EditText {
            chat_id,
            message_id,
            text: text.to_string(),
            options: options.clone(),
        });
        self.check_chat(chat_id)
    }

    async fn send_media(
        &self,
        chat_id: i64,
        media: &Media,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<i32, ChannelError> {
        self.record(Call::SendMedia {
            chat_id,
            media: media.clone(),
            keyboard,
        });
        self.check_media(chat_id, media)?;
        Ok(self.next_id())
    }

    async fn edit_media(
        &self,
        chat_id: i64,
        message_id: i32,
        media: &Media,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<(), ChannelError> {
        self.record(Call::EditMedia {
            chat_id,
            message_id,
            media: media.clone(),
            keyboard,
        });
        if self.reject_media_edits {
            return Err(ChannelError::Rejected(
                "Bad Request: there is no media in the message to edit".into(),
            ));
        }
        self.check_media(chat_id, media)
    }

    async fn answer_action(&self, action_id: &str, alert: Option<String>) -> Result<(), ChannelError> {
        self.record(Call::Answer {
            action_id: action_id.to_string(),
            alert,
        });
        Ok(())
    }
}

/// Content file of the given type with every payload field filled in
pub fn raw_item(content_type: &str) -> RawContentItem {
    RawContentItem {
        content_type: Some(content_type.to_string()),
        text_content: Some("Текст".to_string()),
        telegram_file_id: Some(format!("file-{content_type}")),
        caption: Some("Подпись".to_string()),
        external_url: Some("https://example.org/page".to_string()),
        web_app_short_name: Some("quiz".to_string()),
    }
}

/// Navigation node with the given children
pub fn navigation(id: i64, parent_id: Option<i64>, children: Vec<MenuNode>) -> MenuNode {
    MenuNode {
        id,
        title: format!("Раздел {id}"),
        item_type: Some(ItemType::Navigation),
        parent_id,
        description: None,
        bot_message: None,
        children,
        content_files: Vec::new(),
    }
}

/// Content node carrying the given files
pub fn content(id: i64, parent_id: Option<i64>, files: Vec<RawContentItem>) -> MenuNode {
    MenuNode {
        id,
        title: format!("Материал {id}"),
        item_type: Some(ItemType::Content),
        parent_id,
        description: None,
        bot_message: None,
        children: Vec::new(),
        content_files: files,
    }
}
