//! Configuration and settings management
//!
//! Loads settings from config files and environment variables.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Greeting shown on `/start` and on every return to the main menu.
pub const DEFAULT_WELCOME_MESSAGE: &str = "👋 Добро пожаловать в бот организации «Я тебя слышу»!\n\n\
Мы поможем вам найти всю необходимую информацию о слухе вашего ребенка и его развитии.\n\n\
Выберите направление, которое вас интересует:";

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,

    /// Base URL of the content service
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Per-request timeout for the content service, seconds
    #[serde(default = "default_api_timeout_secs")]
    pub api_timeout_secs: u64,
    /// Attempts per request, including the first one
    #[serde(default = "default_api_retries")]
    pub api_retries: u32,

    /// Days without activity before a user is reminded
    #[serde(default = "default_reminder_days")]
    pub inactive_days_threshold: u32,
    /// Minimum days between two reminders to the same user
    #[serde(default = "default_reminder_days")]
    pub reminder_cooldown_days: u32,
    /// Pause between reminder cycles, seconds
    #[serde(default = "default_reminder_interval_secs")]
    pub reminder_interval_secs: u64,
    /// Pause after a failed reminder cycle, seconds
    #[serde(default = "default_reminder_retry_secs")]
    pub reminder_retry_secs: u64,
    /// Pause between two reminder sends, milliseconds
    #[serde(default = "default_reminder_send_delay_ms")]
    pub reminder_send_delay_ms: u64,
    /// Run the reminder loop at all
    #[serde(default = "default_true")]
    pub reminders_enabled: bool,

    /// Search results per page
    #[serde(default = "default_search_page_size")]
    pub search_page_size: usize,
    /// How long the rating confirmation stays on screen, milliseconds
    #[serde(default = "default_rating_pause_ms")]
    pub rating_pause_ms: u64,
    /// Minimum seconds between two registration refreshes of one user
    #[serde(default = "default_registration_refresh_secs")]
    pub registration_refresh_secs: u64,

    /// Suppress link previews for plain text messages
    #[serde(default = "default_true")]
    pub disable_web_page_preview: bool,
    /// Custom greeting, replaces [`DEFAULT_WELCOME_MESSAGE`]
    pub welcome_message: Option<String>,
}

fn default_api_base_url() -> String {
    "http://localhost:8001".to_string()
}

const fn default_api_timeout_secs() -> u64 {
    30
}

const fn default_api_retries() -> u32 {
    3
}

const fn default_reminder_days() -> u32 {
    10
}

const fn default_reminder_interval_secs() -> u64 {
    12 * 3600
}

const fn default_reminder_retry_secs() -> u64 {
    3600
}

const fn default_reminder_send_delay_ms() -> u64 {
    500
}

const fn default_search_page_size() -> usize {
    5
}

const fn default_rating_pause_ms() -> u64 {
    2000
}

const fn default_registration_refresh_secs() -> u64 {
    300
}

const fn default_true() -> bool {
    true
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use hearing_guide_bot::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or `TELEGRAM_TOKEN` is missing.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Not checked into git
            .add_source(File::with_name("config/local").required(false))
            // `APP__API_RETRIES=5` sets `api_retries`
            .add_source(Environment::with_prefix("APP").separator("__"))
            // UPPER_SNAKE_CASE is mapped to snake_case, empty values count as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        s.try_deserialize()
    }

    /// Greeting text, custom or default
    #[must_use]
    pub fn welcome_text(&self) -> &str {
        self.welcome_message
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(DEFAULT_WELCOME_MESSAGE)
    }

    /// Request timeout for the content service
    #[must_use]
    pub const fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    /// Attempts per request, never less than one
    #[must_use]
    pub fn api_attempts(&self) -> u32 {
        self.api_retries.max(1)
    }
}
