//! Shared fakes for the integration tests: an in-memory catalog service and a
//! channel that records everything it is asked to show.

#![allow(dead_code)]

use async_trait::async_trait;
use hearing_guide_bot::api::models::{
    Activity, ItemType, MenuNode, RawContentItem, Registration, ReminderCandidate,
    ReminderTemplate, SearchResult,
};
use hearing_guide_bot::api::{ApiError, Backend};
use hearing_guide_bot::channel::{Channel, ChannelError, Media, MessageOptions};
use hearing_guide_bot::config::Settings;
use hearing_guide_bot::session::{EventKind, InboundEvent, SessionEngine};
use serde_json::Value;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use teloxide::types::InlineKeyboardMarkup;

pub const USER: i64 = 42;

pub fn settings() -> Settings {
    Settings {
        telegram_token: "dummy".to_string(),
        api_base_url: "http://localhost:8001".to_string(),
        api_timeout_secs: 1,
        api_retries: 1,
        inactive_days_threshold: 10,
        reminder_cooldown_days: 10,
        reminder_interval_secs: 3600,
        reminder_retry_secs: 600,
        reminder_send_delay_ms: 0,
        reminders_enabled: false,
        search_page_size: 2,
        rating_pause_ms: 0,
        registration_refresh_secs: 60,
        disable_web_page_preview: true,
        welcome_message: None,
    }
}

fn file(content_type: &str) -> RawContentItem {
    RawContentItem {
        content_type: Some(content_type.to_string()),
        text_content: Some(format!("Описание ({content_type})")),
        telegram_file_id: Some(format!("file-{content_type}")),
        caption: None,
        external_url: None,
        web_app_short_name: None,
    }
}

fn node(id: i64, title: &str, item_type: ItemType, parent_id: Option<i64>) -> MenuNode {
    MenuNode {
        id,
        title: title.to_string(),
        item_type: Some(item_type),
        parent_id,
        description: None,
        bot_message: None,
        children: Vec::new(),
        content_files: Vec::new(),
    }
}

/// Catalog used by every scenario:
///
/// ```text
/// 1 Диагностика (nav)
/// ├── 2 Аудиограмма (text)
/// ├── 3 Пустой раздел (nav, no children)
/// ├── 5 Голограмма (unknown content type)
/// └── 6 Слуховые аппараты (nav)
///     ├── 7 Выбор аппарата (text)
///     ├── 8 Настройка аппарата (text)
///     └── 9 Уход за аппаратом (text)
/// 4 Памятка (photo + unknown supplementary item)
/// ```
pub fn catalog() -> Vec<MenuNode> {
    let mut nodes = vec![
        node(1, "Диагностика", ItemType::Navigation, None),
        node(2, "Аудиограмма", ItemType::Content, Some(1)),
        node(3, "Пустой раздел", ItemType::Navigation, Some(1)),
        node(4, "Памятка", ItemType::Content, None),
        node(5, "Голограмма", ItemType::Content, Some(1)),
        node(6, "Слуховые аппараты", ItemType::Navigation, Some(1)),
        node(7, "Выбор аппарата", ItemType::Content, Some(6)),
        node(8, "Настройка аппарата", ItemType::Content, Some(6)),
        node(9, "Уход за аппаратом", ItemType::Content, Some(6)),
    ];
    for n in &mut nodes {
        n.content_files = match n.id {
            2 | 7 | 8 | 9 => vec![file("text")],
            4 => vec![file("photo"), file("hologram")],
            5 => vec![file("hologram")],
            _ => Vec::new(),
        };
    }
    nodes
}

/// In-memory content service
#[derive(Default)]
pub struct FakeBackend {
    pub nodes: Vec<MenuNode>,
    pub questions: Mutex<Vec<String>>,
    pub ratings: Mutex<Vec<(i64, u8)>>,
    pub activities: Mutex<Vec<Activity>>,
    pub fail_submissions: bool,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            nodes: catalog(),
            ..Self::default()
        }
    }

    pub fn failing_submissions(mut self) -> Self {
        self.fail_submissions = true;
        self
    }

    fn children(&self, parent_id: Option<i64>) -> Vec<MenuNode> {
        self.nodes
            .iter()
            .filter(|n| n.parent_id == parent_id)
            .cloned()
            .collect()
    }

    pub fn node(&self, id: i64) -> Option<&MenuNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().map(|q| q.clone()).unwrap_or_default()
    }

    pub fn ratings(&self) -> Vec<(i64, u8)> {
        self.ratings.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn submission(&self) -> Result<(), ApiError> {
        if self.fail_submissions {
            return Err(ApiError::Client {
                status: 500,
                message: "Internal Server Error".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn menu_items(
        &self,
        _user_id: i64,
        parent_id: Option<i64>,
    ) -> Result<Vec<MenuNode>, ApiError> {
        Ok(self.children(parent_id))
    }

    async fn menu_content(&self, _user_id: i64, node_id: i64) -> Result<MenuNode, ApiError> {
        let mut node = self.node(node_id).cloned().ok_or_else(|| ApiError::Client {
            status: 404,
            message: "Menu item not found".to_string(),
        })?;
        node.children = self.children(Some(node_id));
        Ok(node)
    }

    async fn search(
        &self,
        _user_id: i64,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>, ApiError> {
        let query = query.to_lowercase();
        Ok(self
            .nodes
            .iter()
            .filter(|n| n.title.to_lowercase().contains(&query))
            .take(limit)
            .map(|n| SearchResult {
                id: n.id,
                title: n.title.clone(),
                description: n.description.clone(),
            })
            .collect())
    }

    async fn submit_question(&self, _user_id: i64, text: &str) -> Result<(), ApiError> {
        self.submission()?;
        if let Ok(mut q) = self.questions.lock() {
            q.push(text.to_string());
        }
        Ok(())
    }

    async fn submit_rating(&self, _user_id: i64, node_id: i64, rating: u8) -> Result<(), ApiError> {
        self.submission()?;
        if let Ok(mut r) = self.ratings.lock() {
            r.push((node_id, rating));
        }
        Ok(())
    }

    async fn log_activity(&self, activity: &Activity) -> Result<(), ApiError> {
        if let Ok(mut a) = self.activities.lock() {
            a.push(activity.clone());
        }
        Ok(())
    }

    async fn register_user(&self, _payload: &Value) -> Result<Registration, ApiError> {
        Ok(Registration {
            user_created: true,
            user_updated: false,
        })
    }

    async fn inactive_users(
        &self,
        _inactive_days: u32,
        _cooldown_days: u32,
    ) -> Result<Vec<ReminderCandidate>, ApiError> {
        Ok(Vec::new())
    }

    async fn active_template(&self) -> Result<Option<ReminderTemplate>, ApiError> {
        Ok(None)
    }

    async fn mark_reminded(&self, _user_id: i64) -> Result<(), ApiError> {
        Ok(())
    }
}

/// What the bot showed
#[derive(Debug, Clone, PartialEq)]
pub enum Shown {
    Text { text: String, edit: bool },
    Media { file_id: String, edit: bool },
    Answer { alert: Option<String> },
}

/// Channel that records every call
#[derive(Default)]
pub struct Recorder {
    shown: Mutex<Vec<Shown>>,
    next_id: AtomicI32,
}

impl Recorder {
    pub fn shown(&self) -> Vec<Shown> {
        self.shown.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn texts(&self) -> Vec<String> {
        self.shown()
            .into_iter()
            .filter_map(|s| match s {
                Shown::Text { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn media(&self) -> Vec<String> {
        self.shown()
            .into_iter()
            .filter_map(|s| match s {
                Shown::Media { file_id, .. } => Some(file_id),
                _ => None,
            })
            .collect()
    }

    pub fn answers(&self) -> Vec<Option<String>> {
        self.shown()
            .into_iter()
            .filter_map(|s| match s {
                Shown::Answer { alert } => Some(alert),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut s) = self.shown.lock() {
            s.clear();
        }
    }

    fn push(&self, shown: Shown) -> i32 {
        if let Ok(mut s) = self.shown.lock() {
            s.push(shown);
        }
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl Channel for Recorder {
    async fn send_text(
        &self,
        _chat_id: i64,
        text: &str,
        _options: &MessageOptions,
    ) -> Result<i32, ChannelError> {
        Ok(self.push(Shown::Text {
            text: text.to_string(),
            edit: false,
        }))
    }

    async fn edit_text(
        &self,
        _chat_id: i64,
        _message_id: i32,
        text: &str,
        _options: &MessageOptions,
    ) -> Result<(), ChannelError> {
        self.push(Shown::Text {
            text: text.to_string(),
            edit: true,
        });
        Ok(())
    }

    async fn send_media(
        &self,
        _chat_id: i64,
        media: &Media,
        _keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<i32, ChannelError> {
        Ok(self.push(Shown::Media {
            file_id: media.file_id.clone(),
            edit: false,
        }))
    }

    async fn edit_media(
        &self,
        _chat_id: i64,
        _message_id: i32,
        media: &Media,
        _keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<(), ChannelError> {
        self.push(Shown::Media {
            file_id: media.file_id.clone(),
            edit: true,
        });
        Ok(())
    }

    async fn answer_action(&self, _action_id: &str, alert: Option<String>) -> Result<(), ChannelError> {
        self.push(Shown::Answer { alert });
        Ok(())
    }
}

pub struct Harness {
    pub backend: Arc<FakeBackend>,
    pub channel: Arc<Recorder>,
    pub engine: SessionEngine,
}

impl Harness {
    pub fn new(backend: FakeBackend) -> Self {
        let backend = Arc::new(backend);
        let channel = Arc::new(Recorder::default());
        let engine = SessionEngine::new(backend.clone(), channel.clone(), &settings());
        Self {
            backend,
            channel,
            engine,
        }
    }
}

pub fn press(data: &str) -> InboundEvent {
    InboundEvent {
        user_id: USER,
        chat_id: USER,
        kind: EventKind::Action {
            id: format!("cb-{data}"),
            message_id: Some(1),
            data: data.to_string(),
        },
    }
}

pub fn text(body: &str) -> InboundEvent {
    InboundEvent {
        user_id: USER,
        chat_id: USER,
        kind: EventKind::Text(body.to_string()),
    }
}

pub fn start() -> InboundEvent {
    InboundEvent {
        user_id: USER,
        chat_id: USER,
        kind: EventKind::Start,
    }
}
