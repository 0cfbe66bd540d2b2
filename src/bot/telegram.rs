//! Telegram implementation of [`Channel`].
//!
//! All text goes out as HTML. Edits that leave a message unchanged count as
//! success; any other refusal by the Bot API is reported as
//! [`ChannelError::Rejected`] so callers can fall back to a new message.

use crate::channel::{Channel, ChannelError, Media, MediaKind, MessageOptions};
use crate::utils::{ellipsize, truncate_str};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQueryId, ChatId, FileId, InlineKeyboardMarkup, InputFile, InputMedia,
    InputMediaDocument, InputMediaPhoto, InputMediaVideo, LinkPreviewOptions, MessageId, ParseMode,
};
use teloxide::{ApiError, RequestError};
use tracing::debug;

/// Maximum message length for Telegram with safety margin.
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4000;
/// Telegram's caption limit
pub const TELEGRAM_CAPTION_LIMIT: usize = 1024;

fn classify(e: RequestError) -> ChannelError {
    match e {
        RequestError::Api(api) => ChannelError::Rejected(api.to_string()),
        other => ChannelError::Transport(other.to_string()),
    }
}

/// Edits that change nothing are not failures
fn edit_result<T>(result: Result<T, RequestError>) -> Result<(), ChannelError> {
    match result {
        Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
        Err(e) => Err(classify(e)),
    }
}

fn fit_text(text: &str) -> String {
    ellipsize(text, TELEGRAM_MESSAGE_LIMIT)
}

const fn preview(options: &MessageOptions) -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: !options.show_preview,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    }
}

fn input_file(media: &Media) -> InputFile {
    InputFile::file_id(FileId(media.file_id.clone()))
}

fn caption(media: &Media) -> Option<String> {
    (!media.caption.is_empty()).then(|| truncate_str(&media.caption, TELEGRAM_CAPTION_LIMIT))
}

fn input_media(media: &Media) -> InputMedia {
    let file = input_file(media);
    let caption = caption(media);
    match media.kind {
        MediaKind::Photo => {
            let mut m = InputMediaPhoto::new(file).parse_mode(ParseMode::Html);
            if let Some(c) = caption {
                m = m.caption(c);
            }
            InputMedia::Photo(m)
        }
        MediaKind::Video => {
            let mut m = InputMediaVideo::new(file).parse_mode(ParseMode::Html);
            if let Some(c) = caption {
                m = m.caption(c);
            }
            InputMedia::Video(m)
        }
        MediaKind::Document => {
            let mut m = InputMediaDocument::new(file).parse_mode(ParseMode::Html);
            if let Some(c) = caption {
                m = m.caption(c);
            }
            InputMedia::Document(m)
        }
    }
}

/// Channel backed by the Telegram Bot API
#[derive(Clone)]
pub struct TelegramChannel {
    bot: Bot,
}

impl TelegramChannel {
    /// Wrap a bot
    #[must_use]
    pub const fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        options: &MessageOptions,
    ) -> Result<i32, ChannelError> {
        let mut req = self
            .bot
            .send_message(ChatId(chat_id), fit_text(text))
            .parse_mode(ParseMode::Html)
            .link_preview_options(preview(options));
        if let Some(keyboard) = options.keyboard.clone() {
            req = req.reply_markup(keyboard);
        }
        let msg = req.await.map_err(classify)?;
        Ok(msg.id.0)
    }

    async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        options: &MessageOptions,
    ) -> Result<(), ChannelError> {
        let mut req = self
            .bot
            .edit_message_text(ChatId(chat_id), MessageId(message_id), fit_text(text))
            .parse_mode(ParseMode::Html)
            .link_preview_options(preview(options));
        if let Some(keyboard) = options.keyboard.clone() {
            req = req.reply_markup(keyboard);
        }
        edit_result(req.await)
    }

    async fn send_media(
        &self,
        chat_id: i64,
        media: &Media,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<i32, ChannelError> {
        let chat = ChatId(chat_id);
        let file = input_file(media);
        let caption = caption(media);
        debug!(chat_id = chat_id, kind = ?media.kind, "Sending media");

        let result = match media.kind {
            MediaKind::Photo => {
                let mut req = self.bot.send_photo(chat, file).parse_mode(ParseMode::Html);
                if let Some(c) = caption {
                    req = req.caption(c);
                }
                if let Some(k) = keyboard {
                    req = req.reply_markup(k);
                }
                req.await
            }
            MediaKind::Video => {
                let mut req = self.bot.send_video(chat, file).parse_mode(ParseMode::Html);
                if let Some(c) = caption {
                    req = req.caption(c);
                }
                if let Some(k) = keyboard {
                    req = req.reply_markup(k);
                }
                req.await
            }
            MediaKind::Document => {
                let mut req = self
                    .bot
                    .send_document(chat, file)
                    .parse_mode(ParseMode::Html);
                if let Some(c) = caption {
                    req = req.caption(c);
                }
                if let Some(k) = keyboard {
                    req = req.reply_markup(k);
                }
                req.await
            }
        };

        Ok(result.map_err(classify)?.id.0)
    }

    async fn edit_media(
        &self,
        chat_id: i64,
        message_id: i32,
        media: &Media,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<(), ChannelError> {
        let mut req =
            self.bot
                .edit_message_media(ChatId(chat_id), MessageId(message_id), input_media(media));
        if let Some(k) = keyboard {
            req = req.reply_markup(k);
        }
        edit_result(req.await)
    }

    async fn answer_action(&self, action_id: &str, alert: Option<String>) -> Result<(), ChannelError> {
        let mut req = self
            .bot
            .answer_callback_query(CallbackQueryId(action_id.to_string()));
        if let Some(text) = alert {
            req = req.text(text).show_alert(true);
        }
        req.await.map(|_| ()).map_err(classify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_text_is_cut() {
        let text = "я".repeat(TELEGRAM_MESSAGE_LIMIT + 10);
        let fitted = fit_text(&text);
        assert_eq!(fitted.chars().count(), TELEGRAM_MESSAGE_LIMIT + 3);
        assert!(fitted.ends_with("..."));
        assert_eq!(fit_text("коротко"), "коротко");
    }

    #[test]
    fn test_not_modified_edit_is_ok() {
        let result: Result<(), RequestError> = Err(RequestError::Api(ApiError::MessageNotModified));
        assert_eq!(edit_result(result), Ok(()));

        let result: Result<(), RequestError> = Err(RequestError::Api(ApiError::BotBlocked));
        assert!(matches!(edit_result(result), Err(ChannelError::Rejected(_))));
    }

    #[test]
    fn test_empty_caption_is_omitted() {
        let media = Media {
            kind: MediaKind::Photo,
            file_id: "f".to_string(),
            caption: String::new(),
        };
        assert_eq!(caption(&media), None);
    }
}
