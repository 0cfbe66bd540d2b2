//! Re-engagement reminders for inactive users
//!
//! A background task asks the service who has been idle long enough, fills
//! the active template with each user's first name and sends it. Users are
//! stamped as reminded only after a successful send.

use crate::api::models::ReminderCandidate;
use crate::api::{ApiError, Backend};
use crate::channel::{Channel, ChannelError, MessageOptions};
use crate::config::Settings;
use crate::utils::escape_html;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const NAME_PLACEHOLDER: &str = "{first_name}";
const DEFAULT_NAME: &str = "Пользователь";

/// Reminder failures
#[derive(Debug, Error)]
pub enum ReminderError {
    /// Candidates or template could not be fetched
    #[error("reminder service call failed: {0}")]
    Api(#[from] ApiError),
    /// The message could not be delivered
    #[error("reminder delivery failed: {0}")]
    Channel(#[from] ChannelError),
}

/// Outcome of one cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Reminders delivered
    pub sent: usize,
    /// Reminders that failed
    pub failed: usize,
}

/// Substitute the escaped first name, or a neutral default when it is blank
#[must_use]
pub fn render_reminder(template: &str, first_name: Option<&str>) -> String {
    let name = first_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_NAME);
    template.replace(NAME_PLACEHOLDER, &escape_html(name))
}

/// Periodic reminder sender
#[derive(Clone)]
pub struct ReminderScheduler {
    backend: Arc<dyn Backend>,
    channel: Arc<dyn Channel>,
    inactive_days: u32,
    cooldown_days: u32,
    interval: Duration,
    retry: Duration,
    send_delay: Duration,
}

impl ReminderScheduler {
    /// Create a scheduler with intervals from `settings`
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, channel: Arc<dyn Channel>, settings: &Settings) -> Self {
        Self {
            backend,
            channel,
            inactive_days: settings.inactive_days_threshold,
            cooldown_days: settings.reminder_cooldown_days,
            interval: Duration::from_secs(settings.reminder_interval_secs),
            retry: Duration::from_secs(settings.reminder_retry_secs),
            send_delay: Duration::from_millis(settings.reminder_send_delay_ms),
        }
    }

    /// Run cycles until `cancel` fires
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            inactive_days = self.inactive_days,
            interval_secs = self.interval.as_secs(),
            "Reminder scheduler started"
        );

        loop {
            let pause = tokio::select! {
                result = self.run_cycle() => match result {
                    Ok(report) => {
                        info!(sent = report.sent, failed = report.failed, "Reminder cycle finished");
                        self.interval
                    }
                    Err(e) => {
                        error!(error = %e, retry_secs = self.retry.as_secs(), "Reminder cycle failed");
                        self.retry
                    }
                },
                () = cancel.cancelled() => break,
            };

            tokio::select! {
                () = tokio::time::sleep(pause) => {}
                () = cancel.cancelled() => break,
            }
        }

        info!("Reminder scheduler stopped");
    }

    /// One pass over the current candidates
    ///
    /// # Errors
    ///
    /// Returns `ReminderError::Api` if candidates or the template cannot be
    /// fetched. Individual send failures are only counted.
    pub async fn run_cycle(&self) -> Result<CycleReport, ReminderError> {
        let candidates = self
            .backend
            .inactive_users(self.inactive_days, self.cooldown_days)
            .await?;
        if candidates.is_empty() {
            debug!("No inactive users to remind");
            return Ok(CycleReport::default());
        }

        let Some(template) = self.backend.active_template().await? else {
            warn!(candidates = candidates.len(), "No active reminder template, skipping cycle");
            return Ok(CycleReport::default());
        };

        info!(candidates = candidates.len(), "Sending reminders");
        let mut report = CycleReport::default();
        for (index, candidate) in candidates.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.send_delay).await;
            }
            if self.remind(candidate, &template.message_template).await {
                report.sent += 1;
            } else {
                report.failed += 1;
            }
        }
        Ok(report)
    }

    async fn remind(&self, candidate: &ReminderCandidate, template: &str) -> bool {
        let user_id = candidate.telegram_user_id;
        let text = render_reminder(template, candidate.first_name.as_deref());

        if let Err(e) = self
            .channel
            .send_text(user_id, &text, &MessageOptions::default())
            .await
        {
            warn!(user_id = user_id, error = %e, "Failed to send reminder");
            return false;
        }

        debug!(
            user_id = user_id,
            idle_since = ?candidate.last_activity_at(),
            "Reminder sent"
        );
        self.stamp(user_id).await;
        true
    }

    async fn stamp(&self, user_id: i64) {
        if let Err(e) = self.backend.mark_reminded(user_id).await {
            warn!(user_id = user_id, error = %e, "Failed to update reminder status");
        }
    }

    /// Send `text` to one user right away and stamp them as reminded
    ///
    /// # Errors
    ///
    /// Returns `ReminderError::Channel` if the message is not delivered.
    pub async fn send_manual(&self, user_id: i64, text: &str) -> Result<(), ReminderError> {
        self.channel
            .send_text(user_id, text, &MessageOptions::default())
            .await?;
        info!(user_id = user_id, "Manual reminder sent");
        self.stamp(user_id).await;
        Ok(())
    }
}
