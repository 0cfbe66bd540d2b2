use super::DispatchError;
use crate::api::models::RawContentItem;

/// Placeholder for a text item without a body
const EMPTY_TEXT: &str = "Текстовый контент пуст.";

/// Flavour of a link item, decides the label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// `youtube_url`
    Youtube,
    /// `vk_url`
    Vk,
    /// `external_url`
    External,
}

impl LinkKind {
    /// Heading shown above the URL
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Youtube => "🎥 YouTube видео:",
            Self::Vk => "📹 VK видео:",
            Self::External => "🔗 Внешняя ссылка:",
        }
    }
}

/// A content file that is known to be renderable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentItem {
    /// Plain text
    Text {
        /// Raw body
        body: String,
    },
    /// Stored photo
    Photo {
        /// Telegram file id
        file_id: String,
        /// Raw caption
        caption: Option<String>,
    },
    /// Stored video
    Video {
        /// Telegram file id
        file_id: String,
        /// Raw caption
        caption: Option<String>,
    },
    /// Stored document
    Document {
        /// Telegram file id
        file_id: String,
        /// Raw caption
        caption: Option<String>,
    },
    /// Link to a video platform or any other site
    Link {
        /// Which label to use
        kind: LinkKind,
        /// Target URL
        url: String,
        /// Raw caption
        caption: Option<String>,
    },
    /// Telegram mini app
    WebApp {
        /// Launch URL (or bare short name)
        url: String,
        /// Display name
        name: Option<String>,
        /// Raw caption
        caption: Option<String>,
    },
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).cloned()
}

fn required(value: Option<&String>, kind: &str, field: &'static str) -> Result<String, DispatchError> {
    non_blank(value).ok_or_else(|| DispatchError::MissingPayload {
        kind: kind.to_string(),
        field,
    })
}

impl TryFrom<&RawContentItem> for ContentItem {
    type Error = DispatchError;

    fn try_from(raw: &RawContentItem) -> Result<Self, Self::Error> {
        let kind = raw
            .content_type
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(DispatchError::MissingType)?;
        let caption = non_blank(raw.caption.as_ref());

        let item = match kind {
            "text" => Self::Text {
                body: non_blank(raw.text_content.as_ref()).unwrap_or_else(|| EMPTY_TEXT.to_string()),
            },
            "photo" => Self::Photo {
                file_id: required(raw.telegram_file_id.as_ref(), kind, "telegram_file_id")?,
                caption,
            },
            "video" => Self::Video {
                file_id: required(raw.telegram_file_id.as_ref(), kind, "telegram_file_id")?,
                caption,
            },
            "document" => Self::Document {
                file_id: required(raw.telegram_file_id.as_ref(), kind, "telegram_file_id")?,
                caption,
            },
            "youtube_url" | "vk_url" | "external_url" => Self::Link {
                kind: match kind {
                    "youtube_url" => LinkKind::Youtube,
                    "vk_url" => LinkKind::Vk,
                    _ => LinkKind::External,
                },
                url: required(raw.external_url.as_ref(), kind, "external_url")?,
                caption,
            },
            "web_app" => Self::WebApp {
                url: non_blank(raw.external_url.as_ref())
                    .or_else(|| non_blank(raw.web_app_short_name.as_ref()))
                    .ok_or(DispatchError::MissingPayload {
                        kind: kind.to_string(),
                        field: "external_url",
                    })?,
                name: non_blank(raw.web_app_short_name.as_ref()),
                caption,
            },
            other => return Err(DispatchError::UnknownType(other.to_string())),
        };
        Ok(item)
    }
}
