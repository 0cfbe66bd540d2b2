use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Kind of a menu entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// Has children to browse into
    Navigation,
    /// Carries content files
    Content,
    /// Anything the bot does not know about
    #[serde(other)]
    Other,
}

/// A node of the catalog tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuNode {
    /// Node id
    pub id: i64,
    /// Display title
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    /// Missing or unknown types are rendered as content
    #[serde(default)]
    pub item_type: Option<ItemType>,
    /// Parent node, `None` at the root level
    #[serde(default)]
    pub parent_id: Option<i64>,
    /// Free text description
    #[serde(default)]
    pub description: Option<String>,
    /// Text shown above the children of a navigation node
    #[serde(default)]
    pub bot_message: Option<String>,
    /// Direct children, only filled by the content endpoint
    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<MenuNode>,
    /// Content attached to the node, first one is the primary item
    #[serde(default, deserialize_with = "null_as_default")]
    pub content_files: Vec<RawContentItem>,
}

impl MenuNode {
    /// Navigation nodes open a submenu, everything else is content
    #[must_use]
    pub fn is_navigation(&self) -> bool {
        self.item_type == Some(ItemType::Navigation)
    }
}

/// A content file as the service sends it.
///
/// Parsed into [`crate::content::ContentItem`] before rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawContentItem {
    /// `text`, `photo`, `video`, `document`, `youtube_url`, `vk_url`,
    /// `external_url` or `web_app`
    #[serde(default)]
    pub content_type: Option<String>,
    /// Body of a text item
    #[serde(default, alias = "content_text")]
    pub text_content: Option<String>,
    /// Telegram file id of a media item
    #[serde(default)]
    pub telegram_file_id: Option<String>,
    /// Caption shown with media and links
    #[serde(default)]
    pub caption: Option<String>,
    /// Target of link and web app items
    #[serde(default, alias = "content_url")]
    pub external_url: Option<String>,
    /// Short name of a mini app
    #[serde(default)]
    pub web_app_short_name: Option<String>,
}

/// One search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Node id
    pub id: i64,
    /// Node title
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
}

/// A user who should get a re-engagement reminder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderCandidate {
    /// Telegram user id, also the private chat id
    #[serde(alias = "telegram_id")]
    pub telegram_user_id: i64,
    /// First name, may be blank
    #[serde(default)]
    pub first_name: Option<String>,
    /// Last name
    #[serde(default)]
    pub last_name: Option<String>,
    /// Telegram username
    #[serde(default)]
    pub username: Option<String>,
    /// Last activity, ISO 8601
    #[serde(default)]
    pub last_activity: Option<String>,
    /// Last reminder, ISO 8601
    #[serde(default, alias = "last_reminder_sent")]
    pub reminder_sent_at: Option<String>,
}

impl ReminderCandidate {
    /// Last activity as UTC timestamp, with or without an offset on the wire
    #[must_use]
    pub fn last_activity_at(&self) -> Option<DateTime<Utc>> {
        self.last_activity.as_deref().and_then(parse_timestamp)
    }
}

/// Reminder text template with a `{first_name}` placeholder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderTemplate {
    /// Template id
    #[serde(default)]
    pub id: Option<i64>,
    /// Template name
    #[serde(default)]
    pub name: Option<String>,
    /// Text with `{first_name}`
    pub message_template: String,
}

/// Usage event kinds understood by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    /// `/start`
    StartCommand,
    /// Opened a submenu
    Navigation,
    /// Opened a content node
    ContentView,
    /// Ran a search
    Search,
    /// Sent a question
    QuestionAsk,
    /// Rated a content node
    Rating,
}

/// Body of `POST user-activities`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    /// Acting user
    pub telegram_user_id: i64,
    /// What happened
    pub activity_type: ActivityKind,
    /// Node involved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu_item_id: Option<i64>,
    /// Query text of a search
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
    /// Stars of a rating
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
}

impl Activity {
    /// Event without extra fields
    #[must_use]
    pub const fn new(telegram_user_id: i64, activity_type: ActivityKind) -> Self {
        Self {
            telegram_user_id,
            activity_type,
            menu_item_id: None,
            search_query: None,
            rating: None,
        }
    }

    /// Attach the node involved
    #[must_use]
    pub const fn with_item(mut self, menu_item_id: i64) -> Self {
        self.menu_item_id = Some(menu_item_id);
        self
    }
}

/// Answer of the registration endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    /// A new user record was created
    #[serde(default)]
    pub user_created: bool,
    /// An existing record was refreshed
    #[serde(default)]
    pub user_updated: bool,
}

/// List endpoints answer either `{"items": [...]}` or a bare array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Listing<T> {
    Items { items: Vec<T> },
    Users { users: Vec<T> },
    Bare(Vec<T>),
}

impl<T> Listing<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Self::Items { items } | Self::Users { users: items } | Self::Bare(items) => items,
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
