use super::models::{
    Activity, Listing, MenuNode, Registration, ReminderCandidate, ReminderTemplate, SearchResult,
};
use super::{ApiClient, ApiError};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

const MENU_ITEMS: &str = "api/v1/public/menu-items/";
const SEARCH: &str = "api/v1/public/search/";
const QUESTIONS: &str = "api/v1/public/user-questions/";
const RATINGS: &str = "api/v1/public/ratings/";
const ACTIVITIES: &str = "api/v1/public/user-activities/";
const REGISTER: &str = "api/v1/bot/telegram-user/register";
const INACTIVE_USERS: &str = "api/v1/bot/telegram-user/inactive-users";
const ACTIVE_TEMPLATE: &str = "api/v1/bot/message-template/active-template";
const REMINDER_STATUS: &str = "api/v1/bot/telegram-user/update-reminder-status";

/// Typed endpoints of the content service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Backend: Send + Sync {
    /// Children of `parent_id`, root level for `None`, in service order
    async fn menu_items(&self, user_id: i64, parent_id: Option<i64>)
        -> Result<Vec<MenuNode>, ApiError>;

    /// A node with its children and content files
    async fn menu_content(&self, user_id: i64, node_id: i64) -> Result<MenuNode, ApiError>;

    /// Up to `limit` hits for `query`
    async fn search(
        &self,
        user_id: i64,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>, ApiError>;

    /// Store a free text question
    async fn submit_question(&self, user_id: i64, text: &str) -> Result<(), ApiError>;

    /// Store a 1..=5 rating of a node
    async fn submit_rating(&self, user_id: i64, node_id: i64, rating: u8) -> Result<(), ApiError>;

    /// Record a usage event
    async fn log_activity(&self, activity: &Activity) -> Result<(), ApiError>;

    /// Create or refresh the user record from a raw update
    async fn register_user(&self, payload: &Value) -> Result<Registration, ApiError>;

    /// Users idle for `inactive_days` and not reminded for `cooldown_days`
    async fn inactive_users(
        &self,
        inactive_days: u32,
        cooldown_days: u32,
    ) -> Result<Vec<ReminderCandidate>, ApiError>;

    /// Currently active reminder template, `None` if there is none
    async fn active_template(&self) -> Result<Option<ReminderTemplate>, ApiError>;

    /// Stamp the last reminder time of a user
    async fn mark_reminded(&self, user_id: i64) -> Result<(), ApiError>;
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl Backend for ApiClient {
    async fn menu_items(
        &self,
        user_id: i64,
        parent_id: Option<i64>,
    ) -> Result<Vec<MenuNode>, ApiError> {
        let value = self
            .request(
                Method::GET,
                MENU_ITEMS,
                None,
                &[
                    ("telegram_user_id", Some(user_id.to_string())),
                    ("parent_id", parent_id.map(|id| id.to_string())),
                ],
            )
            .await?;
        decode::<Listing<MenuNode>>(value).map(Listing::into_vec)
    }

    async fn menu_content(&self, user_id: i64, node_id: i64) -> Result<MenuNode, ApiError> {
        let value = self
            .request(
                Method::GET,
                &format!("{MENU_ITEMS}{node_id}/content"),
                None,
                &[("telegram_user_id", Some(user_id.to_string()))],
            )
            .await?;
        decode(value)
    }

    async fn search(
        &self,
        user_id: i64,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>, ApiError> {
        let value = self
            .request(
                Method::GET,
                SEARCH,
                None,
                &[
                    ("telegram_user_id", Some(user_id.to_string())),
                    ("query", Some(query.to_string())),
                    ("limit", Some(limit.to_string())),
                ],
            )
            .await?;
        decode::<Listing<SearchResult>>(value).map(Listing::into_vec)
    }

    async fn submit_question(&self, user_id: i64, text: &str) -> Result<(), ApiError> {
        let body = json!({ "telegram_user_id": user_id, "question_text": text });
        self.request(Method::POST, QUESTIONS, Some(body), &[])
            .await
            .map(|_| ())
    }

    async fn submit_rating(&self, user_id: i64, node_id: i64, rating: u8) -> Result<(), ApiError> {
        let body = json!({
            "telegram_user_id": user_id,
            "menu_item_id": node_id,
            "rating": rating,
        });
        self.request(Method::POST, RATINGS, Some(body), &[])
            .await
            .map(|_| ())
    }

    async fn log_activity(&self, activity: &Activity) -> Result<(), ApiError> {
        let body = serde_json::to_value(activity).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.request(Method::POST, ACTIVITIES, Some(body), &[])
            .await
            .map(|_| ())
    }

    async fn register_user(&self, payload: &Value) -> Result<Registration, ApiError> {
        let value = self
            .request(Method::POST, REGISTER, Some(payload.clone()), &[])
            .await?;
        if value.is_null() {
            return Ok(Registration::default());
        }
        decode(value)
    }

    async fn inactive_users(
        &self,
        inactive_days: u32,
        cooldown_days: u32,
    ) -> Result<Vec<ReminderCandidate>, ApiError> {
        let value = self
            .request(
                Method::GET,
                INACTIVE_USERS,
                None,
                &[
                    ("inactive_days", Some(inactive_days.to_string())),
                    ("days_since_last_reminder", Some(cooldown_days.to_string())),
                ],
            )
            .await?;
        if value.is_null() {
            return Ok(Vec::new());
        }
        decode::<Listing<ReminderCandidate>>(value).map(Listing::into_vec)
    }

    async fn active_template(&self) -> Result<Option<ReminderTemplate>, ApiError> {
        match self.request(Method::GET, ACTIVE_TEMPLATE, None, &[]).await {
            Ok(Value::Null) => Ok(None),
            Ok(value) => decode(value).map(Some),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn mark_reminded(&self, user_id: i64) -> Result<(), ApiError> {
        // The service reads the id from the query string
        self.request(
            Method::POST,
            REMINDER_STATUS,
            None,
            &[("telegram_user_id", Some(user_id.to_string()))],
        )
        .await
        .map(|_| ())
    }
}
