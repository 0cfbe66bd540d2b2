//! Content rendering and delivery
//!
//! Content files are parsed into [`ContentItem`], rendered by a pure
//! function into either a text or a media message, and then delivered by
//! [`ContentDispatcher`] as an edit of the current message or a new one.

mod item;

pub use item::{ContentItem, LinkKind};

use crate::api::models::{MenuNode, RawContentItem};
use crate::channel::{show_text, Channel, ChannelError, Media, MediaKind, MessageOptions, Target};
use crate::utils::escape_html;
use reqwest::Url;
use std::sync::Arc;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, WebAppInfo};
use thiserror::Error;
use tracing::{debug, warn};

/// Header sent before every item after the first one
pub const SUPPLEMENTARY_HEADER: &str = "📎 Дополнительный материал:";
/// Text of a node that has neither files nor a description
pub const NO_DATA: &str = "Данные отсутствуют";
const WEB_APP_BUTTON: &str = "🚀 Открыть приложение";

/// Why an item could not be delivered
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// `content_type` absent or blank
    #[error("content type not specified")]
    MissingType,
    /// `content_type` not one of the known kinds
    #[error("unknown content type: {0}")]
    UnknownType(String),
    /// Known kind without the field it needs
    #[error("{kind} item has no {field}")]
    MissingPayload {
        /// Content type
        kind: String,
        /// Missing field
        field: &'static str,
    },
    /// The channel refused or lost the message
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// An item turned into something the channel can show
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    /// HTML text message
    Text {
        /// Escaped HTML
        text: String,
        /// Keyboard and preview
        options: MessageOptions,
    },
    /// Media message
    Media {
        /// File and escaped caption
        media: Media,
        /// Keyboard under the media
        keyboard: Option<InlineKeyboardMarkup>,
    },
}

fn with_caption(caption: Option<&String>, text: String) -> String {
    match caption {
        Some(caption) => format!("{}\n\n{text}", escape_html(caption)),
        None => text,
    }
}

fn media(kind: MediaKind, file_id: &str, caption: Option<&String>) -> Media {
    Media {
        kind,
        file_id: file_id.to_string(),
        caption: caption.map(|c| escape_html(c)).unwrap_or_default(),
    }
}

/// Render an item. Link items always show their preview, text and web app
/// items follow `disable_preview`. Web apps get a launch button only for
/// `https` URLs.
#[must_use]
pub fn render(
    item: &ContentItem,
    keyboard: Option<InlineKeyboardMarkup>,
    disable_preview: bool,
) -> Rendered {
    match item {
        ContentItem::Text { body } => Rendered::Text {
            text: escape_html(body),
            options: MessageOptions {
                keyboard,
                show_preview: !disable_preview,
            },
        },
        ContentItem::Photo { file_id, caption } => Rendered::Media {
            media: media(MediaKind::Photo, file_id, caption.as_ref()),
            keyboard,
        },
        ContentItem::Video { file_id, caption } => Rendered::Media {
            media: media(MediaKind::Video, file_id, caption.as_ref()),
            keyboard,
        },
        ContentItem::Document { file_id, caption } => Rendered::Media {
            media: media(MediaKind::Document, file_id, caption.as_ref()),
            keyboard,
        },
        ContentItem::Link { kind, url, caption } => Rendered::Text {
            text: with_caption(
                caption.as_ref(),
                format!("{}\n{}", kind.label(), escape_html(url)),
            ),
            options: MessageOptions {
                keyboard,
                show_preview: true,
            },
        },
        ContentItem::WebApp { url, name, caption } => {
            render_web_app(url, name.as_deref(), caption.as_ref(), keyboard, disable_preview)
        }
    }
}

fn render_web_app(
    url: &str,
    name: Option<&str>,
    caption: Option<&String>,
    keyboard: Option<InlineKeyboardMarkup>,
    disable_preview: bool,
) -> Rendered {
    let launch = Url::parse(url).ok().filter(|u| u.scheme() == "https");

    let (text, keyboard) = match launch {
        Some(url) => {
            let mut rows = vec![vec![InlineKeyboardButton::web_app(
                WEB_APP_BUTTON,
                WebAppInfo { url },
            )]];
            if let Some(actions) = keyboard {
                rows.extend(actions.inline_keyboard);
            }
            (
                format!(
                    "🌐 Интерактивное приложение: {}",
                    escape_html(name.unwrap_or("Web App"))
                ),
                Some(InlineKeyboardMarkup::new(rows)),
            )
        }
        None => {
            debug!(url = %url, "Web app URL is not https, rendering a plain link");
            (format!("🔗 Приложение: {}", escape_html(url)), keyboard)
        }
    };

    Rendered::Text {
        text: with_caption(caption, text),
        options: MessageOptions {
            keyboard,
            show_preview: !disable_preview,
        },
    }
}

/// Delivers content items through a [`Channel`]
#[derive(Clone)]
pub struct ContentDispatcher {
    channel: Arc<dyn Channel>,
    disable_preview: bool,
}

impl ContentDispatcher {
    /// Create a dispatcher
    #[must_use]
    pub fn new(channel: Arc<dyn Channel>, disable_preview: bool) -> Self {
        Self {
            channel,
            disable_preview,
        }
    }

    /// Deliver one item, `true` on success. Unknown or incomplete items fail
    /// without touching the channel.
    pub async fn send(&self, target: Target, item: &RawContentItem) -> bool {
        match self.deliver(target, item, None).await {
            Ok(_) => true,
            Err(e) => {
                warn!(chat_id = target.chat_id, error = %e, "Content dispatch failed");
                false
            }
        }
    }

    /// Deliver one item with an optional keyboard, returns the message id.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError` if the item cannot be parsed or the channel
    /// fails.
    pub async fn deliver(
        &self,
        target: Target,
        item: &RawContentItem,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<i32, DispatchError> {
        let item = ContentItem::try_from(item)?;
        let rendered = render(&item, keyboard, self.disable_preview);
        self.emit(target, rendered).await
    }

    async fn emit(&self, target: Target, rendered: Rendered) -> Result<i32, DispatchError> {
        match rendered {
            Rendered::Text { text, options } => {
                Ok(show_text(self.channel.as_ref(), target, &text, &options).await?)
            }
            Rendered::Media { media, keyboard } => {
                if let Some(message_id) = target.message_id {
                    match self
                        .channel
                        .edit_media(target.chat_id, message_id, &media, keyboard.clone())
                        .await
                    {
                        Ok(()) => return Ok(message_id),
                        Err(ChannelError::Rejected(reason)) => {
                            debug!(
                                chat_id = target.chat_id,
                                reason = %reason,
                                "Media edit rejected, sending a new message"
                            );
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                Ok(self
                    .channel
                    .send_media(target.chat_id, &media, keyboard)
                    .await?)
            }
        }
    }

    /// Show a content node.
    ///
    /// The first file goes to `target` with `keyboard` attached. Every other
    /// file follows as a new message after a supplementary header; their
    /// failures are logged and skipped. A node without files shows its bot
    /// message or description as text.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError` if the primary item cannot be delivered.
    pub async fn deliver_node(
        &self,
        target: Target,
        node: &MenuNode,
        keyboard: InlineKeyboardMarkup,
    ) -> Result<i32, DispatchError> {
        let Some((primary, rest)) = node.content_files.split_first() else {
            let text = node
                .bot_message
                .as_deref()
                .or(node.description.as_deref())
                .filter(|t| !t.trim().is_empty())
                .unwrap_or(NO_DATA);
            let options = MessageOptions {
                keyboard: Some(keyboard),
                show_preview: !self.disable_preview,
            };
            return Ok(show_text(self.channel.as_ref(), target, &escape_html(text), &options).await?);
        };

        let message_id = self.deliver(target, primary, Some(keyboard)).await?;

        for (index, item) in rest.iter().enumerate() {
            let fresh = Target::fresh(target.chat_id);
            let result = match self
                .channel
                .send_text(target.chat_id, SUPPLEMENTARY_HEADER, &MessageOptions::default())
                .await
            {
                Ok(_) => self.deliver(fresh, item, None).await.map(|_| ()),
                Err(e) => Err(e.into()),
            };
            if let Err(e) = result {
                warn!(
                    node_id = node.id,
                    item_index = index + 1,
                    error = %e,
                    "Supplementary content item skipped"
                );
            }
        }

        Ok(message_id)
    }
}
