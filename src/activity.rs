//! Usage telemetry and user registration
//!
//! Both are best effort: failures are logged and never reach the user.

use crate::api::models::{Activity, ActivityKind};
use crate::api::Backend;
use moka::future::Cache;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Queries that say nothing about what users look for
const JUNK_QUERIES: &[&str] = &[
    "привет", "hello", "hi", "здравствуйте", "как дела", "как у тебя", "что", "где", "когда",
    "почему", "как", "кто", "какой", "какая", "тест", "test", "проверка", "работает", "бот",
    "помощь", "хелп",
];

fn is_junk_query(query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.chars().count() < 3 || JUNK_QUERIES.contains(&query.as_str()) {
        return true;
    }
    let mut chars = query.chars().filter(|c| *c != ' ');
    chars.next().is_none_or(|first| chars.all(|c| c == first))
}

/// Sends usage events to the service, swallowing failures
#[derive(Clone)]
pub struct ActivityLogger {
    backend: Arc<dyn Backend>,
}

impl ActivityLogger {
    /// Create a logger
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Record one event
    pub async fn log(&self, activity: Activity) {
        if let Err(e) = self.backend.log_activity(&activity).await {
            warn!(
                user_id = activity.telegram_user_id,
                activity = ?activity.activity_type,
                error = %e,
                "Failed to record user activity"
            );
        }
    }

    /// `/start` was issued
    pub async fn start_command(&self, user_id: i64) {
        self.log(Activity::new(user_id, ActivityKind::StartCommand)).await;
    }

    /// A submenu was opened
    pub async fn navigation(&self, user_id: i64, node_id: i64) {
        self.log(Activity::new(user_id, ActivityKind::Navigation).with_item(node_id))
            .await;
    }

    /// A content node was shown
    pub async fn content_view(&self, user_id: i64, node_id: i64) {
        self.log(Activity::new(user_id, ActivityKind::ContentView).with_item(node_id))
            .await;
    }

    /// A search was run. Greetings and test queries are not recorded.
    pub async fn search(&self, user_id: i64, query: &str) {
        if is_junk_query(query) {
            debug!(user_id = user_id, query = query, "Junk search query not recorded");
            return;
        }
        let mut activity = Activity::new(user_id, ActivityKind::Search);
        activity.search_query = Some(query.to_string());
        self.log(activity).await;
    }

    /// A question was submitted
    pub async fn question(&self, user_id: i64) {
        self.log(Activity::new(user_id, ActivityKind::QuestionAsk)).await;
    }

    /// A rating was submitted
    pub async fn rating(&self, user_id: i64, node_id: i64, rating: u8) {
        let mut activity = Activity::new(user_id, ActivityKind::Rating).with_item(node_id);
        activity.rating = Some(rating);
        self.log(activity).await;
    }
}

/// Keeps the service's user records fresh.
///
/// Every update carries the sender's profile; it is forwarded to the
/// registration endpoint at most once per refresh window per user.
#[derive(Clone)]
pub struct UserRegistry {
    backend: Arc<dyn Backend>,
    /// user_id -> () for users registered within the window
    recent: Cache<i64, ()>,
}

impl UserRegistry {
    /// Create a registry refreshing each user at most once per `refresh`
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, refresh: Duration, max_capacity: u64) -> Self {
        let recent = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(refresh)
            .build();
        Self { backend, recent }
    }

    /// Register or refresh `user_id` from a raw update payload
    pub async fn refresh(&self, user_id: i64, payload: &Value) {
        if self.recent.contains_key(&user_id) {
            debug!(user_id = user_id, "Registration is fresh, skipping");
            return;
        }

        match self.backend.register_user(payload).await {
            Ok(registration) => {
                if registration.user_created {
                    info!(user_id = user_id, "New user registered");
                } else if registration.user_updated {
                    debug!(user_id = user_id, "User profile updated");
                }
                self.recent.insert(user_id, ()).await;
            }
            Err(e) => {
                warn!(user_id = user_id, error = %e, "Failed to register user");
            }
        }
    }
}
