//! Transition logic of the conversation.
//!
//! [`SessionEngine::handle`] takes the stored state and one inbound event,
//! talks to the catalog and the channel, and returns the next state. It never
//! fails: errors are logged, the user sees a generic message and the state
//! stays as it was. Resets are the exception and land on the main menu even
//! when the welcome screen could not be shown.

use super::action::{Action, PathKind};
use super::state::State;
use super::validation::{
    validate_query, validate_question, validate_rating, validate_stars, ValidationError,
};
use crate::activity::ActivityLogger;
use crate::api::{ApiError, Backend};
use crate::bot::views;
use crate::channel::{show_text, Channel, ChannelError, MessageOptions, Target};
use crate::config::Settings;
use crate::content::{ContentDispatcher, DispatchError};
use crate::navigator::{Lookup, MenuNavigator, NavigatorError};
use crate::search::SearchEngine;
use std::sync::Arc;
use std::time::Duration;
use teloxide::types::InlineKeyboardMarkup;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// One thing a user did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// Sender
    pub user_id: i64,
    /// Chat to answer in
    pub chat_id: i64,
    /// What happened
    pub kind: EventKind,
}

/// Kinds of inbound events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// `/start`
    Start,
    /// Free text
    Text(String),
    /// Button press
    Action {
        /// Id to acknowledge the press with
        id: String,
        /// Message carrying the pressed button
        message_id: Option<i32>,
        /// Raw callback data
        data: String,
    },
}

impl InboundEvent {
    /// `/start` or the home button
    #[must_use]
    pub fn is_reset(&self) -> bool {
        match &self.kind {
            EventKind::Start => true,
            EventKind::Action { data, .. } => Action::parse(data) == Some(Action::Home),
            EventKind::Text(_) => false,
        }
    }
}

/// Failures that end in the generic error message
#[derive(Debug, Error)]
pub enum EngineError {
    /// Catalog lookup failed
    #[error(transparent)]
    Catalog(#[from] NavigatorError),
    /// Any other service call failed
    #[error(transparent)]
    Api(#[from] ApiError),
    /// Content could not be shown
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    /// A message could not be shown
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Next state plus an optional alert for the pressed button
struct Step {
    next: State,
    alert: Option<&'static str>,
}

impl Step {
    const fn to(next: State) -> Self {
        Self { next, alert: None }
    }

    const fn alert(next: State, alert: &'static str) -> Self {
        Self {
            next,
            alert: Some(alert),
        }
    }
}

/// Who to answer and which message to replace
#[derive(Debug, Clone, Copy)]
struct Ctx {
    user_id: i64,
    chat_id: i64,
    message_id: Option<i32>,
}

impl Ctx {
    fn target(self) -> Target {
        Target {
            chat_id: self.chat_id,
            message_id: self.message_id,
        }
    }

    const fn fresh(self) -> Target {
        Target::fresh(self.chat_id)
    }
}

type StepResult = Result<Step, EngineError>;

/// Drives every user's conversation
#[derive(Clone)]
pub struct SessionEngine {
    backend: Arc<dyn Backend>,
    channel: Arc<dyn Channel>,
    navigator: MenuNavigator,
    search: SearchEngine,
    content: ContentDispatcher,
    activity: ActivityLogger,
    welcome: String,
    rating_pause: Duration,
}

impl SessionEngine {
    /// Wire the engine from its collaborators and settings
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, channel: Arc<dyn Channel>, settings: &Settings) -> Self {
        Self {
            navigator: MenuNavigator::new(backend.clone()),
            search: SearchEngine::new(backend.clone(), settings.search_page_size),
            content: ContentDispatcher::new(channel.clone(), settings.disable_web_page_preview),
            activity: ActivityLogger::new(backend.clone()),
            welcome: views::welcome_text(settings.welcome_text()),
            rating_pause: Duration::from_millis(settings.rating_pause_ms),
            backend,
            channel,
        }
    }

    /// Apply one event to `state` and return the next state.
    ///
    /// Button presses are acknowledged exactly once, with an alert when the
    /// press was refused or failed.
    pub async fn handle(&self, state: State, event: &InboundEvent) -> State {
        let ctx = Ctx {
            user_id: event.user_id,
            chat_id: event.chat_id,
            message_id: match &event.kind {
                EventKind::Action { message_id, .. } => *message_id,
                _ => None,
            },
        };

        let result = match &event.kind {
            EventKind::Start => self.start(ctx).await,
            EventKind::Text(text) => self.on_text(ctx, &state, text).await,
            EventKind::Action { data, .. } => match Action::parse(data) {
                Some(action) => self.on_action(ctx, &state, action).await,
                None => {
                    warn!(user_id = ctx.user_id, data = %data, "Unknown callback data");
                    Ok(Step::alert(state.clone(), views::INVALID_DATA_ALERT))
                }
            },
        };

        let (next, alert) = match result {
            Ok(step) => (step.next, step.alert),
            Err(e) => {
                error!(
                    user_id = ctx.user_id,
                    state = state.name(),
                    error = %e,
                    "Session handler failed"
                );
                self.show_error(ctx.chat_id).await;
                let next = if event.is_reset() { State::MainMenu } else { state };
                (next, Some(views::ERROR_ALERT))
            }
        };

        if let EventKind::Action { id, .. } = &event.kind {
            if let Err(e) = self
                .channel
                .answer_action(id, alert.map(ToString::to_string))
                .await
            {
                warn!(user_id = ctx.user_id, error = %e, "Failed to answer callback");
            }
        }

        debug!(user_id = ctx.user_id, state = next.name(), "Session state updated");
        next
    }

    /// Acknowledge a button press that carries no event, without an alert
    pub async fn acknowledge(&self, action_id: &str) {
        if let Err(e) = self.channel.answer_action(action_id, None).await {
            warn!(action_id = action_id, error = %e, "Failed to answer callback");
        }
    }

    async fn on_action(&self, ctx: Ctx, state: &State, action: Action) -> StepResult {
        match action {
            Action::Home => self.main_menu(ctx.target()).await,
            Action::Path(path) => self.select_path(ctx, path).await,
            Action::Menu(id) | Action::SearchResult(id) => self.open_node(ctx, state, id).await,
            Action::Back => self.back(ctx, state).await,
            Action::ContentMenu(id) => self.content_menu(ctx, state, id).await,
            Action::Search => {
                self.show(ctx.target(), views::SEARCH_PROMPT, views::home_keyboard())
                    .await?;
                Ok(Step::to(State::SearchWaiting {
                    query: None,
                    return_to: state.current_node(),
                }))
            }
            Action::SearchPage(page) => self.search_page(ctx, state, page).await,
            Action::AskQuestion => {
                self.show(ctx.target(), views::QUESTION_PROMPT, views::home_keyboard())
                    .await?;
                Ok(Step::to(State::QuestionInput))
            }
            Action::ContentRating(id) => self.ask_rating(ctx, state, id).await,
            Action::Rate(stars) => match state {
                State::RatingWaiting { content_id, title } => match validate_stars(stars) {
                    Ok(stars) => {
                        self.submit_rating(ctx, ctx.target(), *content_id, title, stars)
                            .await
                    }
                    Err(_) => Ok(Step::alert(state.clone(), views::INVALID_RATING_ALERT)),
                },
                _ => Ok(Step::alert(state.clone(), views::RATING_CONTEXT_ALERT)),
            },
            Action::SearchInfo => Ok(Step::to(state.clone())),
            Action::NoResults => Ok(Step::alert(state.clone(), views::NO_RESULTS_ALERT)),
        }
    }

    async fn on_text(&self, ctx: Ctx, state: &State, text: &str) -> StepResult {
        match state {
            State::SearchWaiting { return_to, .. } => self.run_search(ctx, *return_to, text).await,
            State::QuestionInput => self.submit_question(ctx, text).await,
            State::RatingWaiting { content_id, title } => match validate_rating(text) {
                Ok(stars) => {
                    self.submit_rating(ctx, ctx.fresh(), *content_id, title, stars)
                        .await
                }
                Err(_) => {
                    self.show(
                        ctx.fresh(),
                        views::RATING_PROMPT_AGAIN,
                        views::rating_keyboard(*content_id),
                    )
                    .await?;
                    Ok(Step::to(state.clone()))
                }
            },
            State::MainMenu
            | State::SelectedPath { .. }
            | State::MenuNavigation { .. }
            | State::ContentView { .. } => {
                self.show(ctx.fresh(), views::USE_MENU_HINT, views::recovery_keyboard())
                    .await?;
                Ok(Step::to(state.clone()))
            }
        }
    }

    async fn show(
        &self,
        target: Target,
        text: &str,
        keyboard: InlineKeyboardMarkup,
    ) -> Result<i32, ChannelError> {
        show_text(
            self.channel.as_ref(),
            target,
            text,
            &MessageOptions::with_keyboard(keyboard),
        )
        .await
    }

    async fn show_error(&self, chat_id: i64) {
        if let Err(e) = self
            .show(Target::fresh(chat_id), views::ERROR_MESSAGE, views::home_keyboard())
            .await
        {
            warn!(chat_id = chat_id, error = %e, "Failed to show error message");
        }
    }

    async fn start(&self, ctx: Ctx) -> StepResult {
        info!(user_id = ctx.user_id, "Session reset by /start");
        self.activity.start_command(ctx.user_id).await;
        self.main_menu(ctx.fresh()).await
    }

    async fn main_menu(&self, target: Target) -> StepResult {
        self.show(target, &self.welcome, views::main_menu_keyboard())
            .await?;
        Ok(Step::to(State::MainMenu))
    }

    async fn select_path(&self, ctx: Ctx, path: PathKind) -> StepResult {
        let nodes = self.navigator.list_children(ctx.user_id, None).await?;
        if nodes.is_empty() {
            self.show(ctx.target(), views::MATERIALS_UNAVAILABLE, views::home_keyboard())
                .await?;
            return Ok(Step::alert(State::MainMenu, views::MATERIALS_UNAVAILABLE_ALERT));
        }

        self.show(
            ctx.target(),
            &views::path_selected_text(path),
            views::menu_keyboard(&nodes),
        )
        .await?;
        Ok(Step::to(State::SelectedPath { path: Some(path) }))
    }

    /// Show a node: its children for navigation, its files otherwise
    async fn open_node(&self, ctx: Ctx, state: &State, id: i64) -> StepResult {
        let Lookup::Found(node) = self.navigator.get_content(ctx.user_id, id).await? else {
            return Ok(Step::alert(state.clone(), views::NOT_FOUND_ALERT));
        };

        if node.is_navigation() {
            if node.children.is_empty() {
                return Ok(Step::alert(state.clone(), views::NO_SUBSECTIONS_ALERT));
            }
            self.show(
                ctx.target(),
                &views::submenu_text(&node),
                views::menu_keyboard(&node.children),
            )
            .await?;
            self.activity.navigation(ctx.user_id, id).await;
            return Ok(Step::to(State::MenuNavigation {
                current: id,
                parent_id: node.parent_id,
            }));
        }

        self.content
            .deliver_node(ctx.target(), &node, views::content_actions_keyboard(id))
            .await?;
        self.activity.content_view(ctx.user_id, id).await;
        Ok(Step::to(State::ContentView {
            content_id: id,
            title: node.title,
        }))
    }

    /// One level up, resolved from the parent stored in the state
    async fn back(&self, ctx: Ctx, state: &State) -> StepResult {
        match state {
            State::MenuNavigation {
                parent_id: Some(parent),
                ..
            } => self.open_node(ctx, state, *parent).await,
            State::ContentView { content_id, .. } => {
                self.content_menu(ctx, state, *content_id).await
            }
            State::SearchWaiting {
                return_to: Some(node),
                ..
            } => self.open_node(ctx, state, *node).await,
            _ => self.main_menu(ctx.target()).await,
        }
    }

    /// Listing that contains node `id`
    async fn content_menu(&self, ctx: Ctx, state: &State, id: i64) -> StepResult {
        let Lookup::Found(node) = self.navigator.get_content(ctx.user_id, id).await? else {
            return Ok(Step::alert(state.clone(), views::NOT_FOUND_ALERT));
        };

        if let Some(parent) = node.parent_id {
            return self.open_node(ctx, state, parent).await;
        }

        let roots = self.navigator.list_children(ctx.user_id, None).await?;
        if roots.is_empty() {
            return self.main_menu(ctx.target()).await;
        }
        self.show(ctx.target(), views::GO_TO_SECTION, views::menu_keyboard(&roots))
            .await?;
        Ok(Step::to(State::SelectedPath { path: None }))
    }

    async fn run_search(&self, ctx: Ctx, return_to: Option<i64>, text: &str) -> StepResult {
        let query = match validate_query(text) {
            Ok(query) => query,
            Err(_) => {
                self.show(ctx.fresh(), views::SEARCH_TOO_SHORT, views::home_keyboard())
                    .await?;
                return Ok(Step::to(State::SearchWaiting {
                    query: None,
                    return_to,
                }));
            }
        };

        match self.search.page(ctx.user_id, query, 1).await {
            Ok(page) => {
                self.activity.search(ctx.user_id, query).await;
                self.show(
                    ctx.fresh(),
                    &page.render_text(),
                    views::search_results_keyboard(&page),
                )
                .await?;
                Ok(Step::to(State::SearchWaiting {
                    query: Some(query.to_string()),
                    return_to,
                }))
            }
            Err(e) => {
                warn!(user_id = ctx.user_id, error = %e, "Search failed");
                self.show(ctx.fresh(), views::SEARCH_FAILED, views::recovery_keyboard())
                    .await?;
                Ok(Step::to(State::SearchWaiting {
                    query: None,
                    return_to,
                }))
            }
        }
    }

    async fn search_page(&self, ctx: Ctx, state: &State, page: usize) -> StepResult {
        let State::SearchWaiting {
            query: Some(query), ..
        } = state
        else {
            return Ok(Step::alert(state.clone(), views::SEARCH_EXPIRED_ALERT));
        };

        let page = self.search.page(ctx.user_id, query, page).await?;
        self.show(
            ctx.target(),
            &page.render_text(),
            views::search_results_keyboard(&page),
        )
        .await?;
        Ok(Step::to(state.clone()))
    }

    async fn submit_question(&self, ctx: Ctx, text: &str) -> StepResult {
        let question = match validate_question(text) {
            Ok(question) => question,
            Err(reason) => {
                let prompt = match reason {
                    ValidationError::TooLong => views::QUESTION_TOO_LONG,
                    ValidationError::Trivial => views::QUESTION_TRIVIAL,
                    _ => views::QUESTION_TOO_SHORT,
                };
                self.show(ctx.fresh(), prompt, views::home_keyboard()).await?;
                return Ok(Step::to(State::QuestionInput));
            }
        };

        let reply = match self.backend.submit_question(ctx.user_id, question).await {
            Ok(()) => {
                info!(user_id = ctx.user_id, "Question submitted");
                self.activity.question(ctx.user_id).await;
                views::QUESTION_SENT
            }
            Err(e) => {
                warn!(user_id = ctx.user_id, error = %e, "Failed to submit question");
                views::QUESTION_FAILED
            }
        };
        self.show(ctx.fresh(), reply, views::main_menu_keyboard())
            .await?;
        Ok(Step::to(State::MainMenu))
    }

    async fn ask_rating(&self, ctx: Ctx, state: &State, id: i64) -> StepResult {
        let Lookup::Found(node) = self.navigator.get_content(ctx.user_id, id).await? else {
            return Ok(Step::alert(state.clone(), views::MATERIAL_NOT_FOUND_ALERT));
        };

        self.show(
            ctx.target(),
            &views::rating_prompt(&node.title),
            views::rating_keyboard(id),
        )
        .await?;
        Ok(Step::to(State::RatingWaiting {
            content_id: id,
            title: node.title,
        }))
    }

    /// Store the rating, thank the user, then return to the material's actions
    async fn submit_rating(
        &self,
        ctx: Ctx,
        target: Target,
        content_id: i64,
        title: &str,
        stars: u8,
    ) -> StepResult {
        let next = State::ContentView {
            content_id,
            title: title.to_string(),
        };

        if let Err(e) = self
            .backend
            .submit_rating(ctx.user_id, content_id, stars)
            .await
        {
            warn!(
                user_id = ctx.user_id,
                content_id = content_id,
                error = %e,
                "Failed to submit rating"
            );
            self.show(
                target,
                views::RATING_FAILED,
                views::back_to_material_keyboard(content_id),
            )
            .await?;
            return Ok(Step::to(next));
        }

        info!(user_id = ctx.user_id, content_id = content_id, rating = stars, "Rating submitted");
        self.activity.rating(ctx.user_id, content_id, stars).await;

        let message_id = show_text(
            self.channel.as_ref(),
            target,
            &views::rating_thanks(stars),
            &MessageOptions::default(),
        )
        .await?;
        tokio::time::sleep(self.rating_pause).await;
        self.show(
            Target::edit(ctx.chat_id, message_id),
            &views::material_heading(title),
            views::content_actions_keyboard(content_id),
        )
        .await?;
        Ok(Step::to(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::ActivityKind;
    use crate::api::MockBackend;
    use crate::testing::{content, navigation, raw_item, Call, RecordingChannel};
    use mockall::predicate::eq;

    const USER: i64 = 7;

    fn settings() -> Settings {
        Settings {
            telegram_token: "token".to_string(),
            api_base_url: "http://api.test".to_string(),
            api_timeout_secs: 1,
            api_retries: 1,
            inactive_days_threshold: 10,
            reminder_cooldown_days: 10,
            reminder_interval_secs: 60,
            reminder_retry_secs: 60,
            reminder_send_delay_ms: 0,
            reminders_enabled: false,
            search_page_size: 2,
            rating_pause_ms: 2000,
            registration_refresh_secs: 60,
            disable_web_page_preview: true,
            welcome_message: Some("Привет".to_string()),
        }
    }

    fn quiet_backend() -> MockBackend {
        let mut backend = MockBackend::new();
        backend.expect_log_activity().returning(|_| Ok(()));
        backend
    }

    fn engine(backend: MockBackend) -> (SessionEngine, Arc<RecordingChannel>) {
        let channel = Arc::new(RecordingChannel::new());
        let engine = SessionEngine::new(Arc::new(backend), channel.clone(), &settings());
        (engine, channel)
    }

    fn press(data: &str) -> InboundEvent {
        InboundEvent {
            user_id: USER,
            chat_id: USER,
            kind: EventKind::Action {
                id: "cb".to_string(),
                message_id: Some(50),
                data: data.to_string(),
            },
        }
    }

    fn text(body: &str) -> InboundEvent {
        InboundEvent {
            user_id: USER,
            chat_id: USER,
            kind: EventKind::Text(body.to_string()),
        }
    }

    fn answers(channel: &RecordingChannel) -> usize {
        channel
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::Answer { .. }))
            .count()
    }

    #[tokio::test]
    async fn test_start_logs_and_shows_welcome() {
        let mut backend = MockBackend::new();
        backend
            .expect_log_activity()
            .withf(|a| a.activity_type == ActivityKind::StartCommand)
            .times(1)
            .returning(|_| Ok(()));
        let (engine, channel) = engine(backend);

        let start = InboundEvent {
            user_id: USER,
            chat_id: USER,
            kind: EventKind::Start,
        };
        let next = engine.handle(State::QuestionInput, &start).await;

        assert_eq!(next, State::MainMenu);
        assert!(channel.texts()[0].starts_with("Привет\n\n"));
        assert_eq!(answers(&channel), 0);
    }

    #[tokio::test]
    async fn test_reset_lands_on_main_menu_when_channel_fails() {
        let backend = quiet_backend();
        let channel = Arc::new(RecordingChannel::new().failing_chat(USER));
        let engine = SessionEngine::new(Arc::new(backend), channel.clone(), &settings());
        let rating = State::RatingWaiting {
            content_id: 5,
            title: "x".to_string(),
        };

        let start = InboundEvent {
            user_id: USER,
            chat_id: USER,
            kind: EventKind::Start,
        };
        assert_eq!(engine.handle(rating.clone(), &start).await, State::MainMenu);
        assert_eq!(engine.handle(rating.clone(), &press("home")).await, State::MainMenu);
        assert_eq!(channel.alerts(), vec![views::ERROR_ALERT]);

        // Other failures keep the state
        assert_eq!(engine.handle(rating.clone(), &text("9")).await, rating);
    }

    #[tokio::test]
    async fn test_bare_press_is_acknowledged_silently() {
        let (engine, channel) = engine(MockBackend::new());

        engine.acknowledge("cb-1").await;

        assert_eq!(
            channel.calls(),
            vec![Call::Answer {
                action_id: "cb-1".to_string(),
                alert: None
            }]
        );
    }

    #[tokio::test]
    async fn test_empty_root_keeps_main_menu() {
        let mut backend = quiet_backend();
        backend
            .expect_menu_items()
            .with(eq(USER), eq(None::<i64>))
            .returning(|_, _| Ok(Vec::new()));
        let (engine, channel) = engine(backend);

        let next = engine.handle(State::MainMenu, &press("path_child")).await;

        assert_eq!(next, State::MainMenu);
        assert_eq!(channel.texts(), vec![views::MATERIALS_UNAVAILABLE]);
        assert_eq!(channel.alerts(), vec![views::MATERIALS_UNAVAILABLE_ALERT]);
    }

    #[tokio::test]
    async fn test_path_lists_roots() {
        let mut backend = quiet_backend();
        backend
            .expect_menu_items()
            .returning(|_, _| Ok(vec![navigation(1, None, vec![])]));
        let (engine, channel) = engine(backend);

        let next = engine.handle(State::MainMenu, &press("path_adult")).await;

        assert_eq!(
            next,
            State::SelectedPath {
                path: Some(PathKind::Adult)
            }
        );
        assert!(channel.texts()[0].contains("своего"));
        assert_eq!(answers(&channel), 1);
    }

    #[tokio::test]
    async fn test_navigation_without_children_stays() {
        let mut backend = quiet_backend();
        backend
            .expect_menu_content()
            .with(eq(USER), eq(3_i64))
            .returning(|_, _| Ok(navigation(3, Some(1), vec![])));
        let (engine, channel) = engine(backend);
        let state = State::SelectedPath {
            path: Some(PathKind::Child),
        };

        let next = engine.handle(state.clone(), &press("menu_3")).await;

        assert_eq!(next, state);
        assert_eq!(channel.alerts(), vec![views::NO_SUBSECTIONS_ALERT]);
        assert!(channel.texts().is_empty());
    }

    #[tokio::test]
    async fn test_navigation_with_children_enters_submenu() {
        let mut backend = MockBackend::new();
        backend
            .expect_menu_content()
            .returning(|_, _| Ok(navigation(3, Some(1), vec![content(4, Some(3), vec![])])));
        backend
            .expect_log_activity()
            .withf(|a| a.activity_type == ActivityKind::Navigation && a.menu_item_id == Some(3))
            .times(1)
            .returning(|_| Ok(()));
        let (engine, _channel) = engine(backend);

        let next = engine.handle(State::MainMenu, &press("menu_3")).await;

        assert_eq!(
            next,
            State::MenuNavigation {
                current: 3,
                parent_id: Some(1)
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_content_type_errors_once() {
        let mut backend = quiet_backend();
        backend
            .expect_menu_content()
            .returning(|_, _| Ok(content(5, Some(1), vec![raw_item("hologram")])));
        let (engine, channel) = engine(backend);
        let state = State::MenuNavigation {
            current: 1,
            parent_id: None,
        };

        let next = engine.handle(state.clone(), &press("menu_5")).await;

        assert_eq!(next, state);
        assert_eq!(channel.texts(), vec![views::ERROR_MESSAGE]);
        assert_eq!(channel.alerts(), vec![views::ERROR_ALERT]);
        assert!(!channel
            .calls()
            .iter()
            .any(|c| matches!(c, Call::SendMedia { .. } | Call::EditMedia { .. })));
    }

    #[tokio::test]
    async fn test_not_found_alerts() {
        let mut backend = quiet_backend();
        backend.expect_menu_content().returning(|_, _| {
            Err(ApiError::Client {
                status: 404,
                message: "Not found".to_string(),
            })
        });
        let (engine, channel) = engine(backend);

        let next = engine.handle(State::MainMenu, &press("menu_99")).await;

        assert_eq!(next, State::MainMenu);
        assert_eq!(channel.alerts(), vec![views::NOT_FOUND_ALERT]);
    }

    #[tokio::test]
    async fn test_content_menu_at_root_lists_roots() {
        let mut backend = quiet_backend();
        backend
            .expect_menu_content()
            .returning(|_, _| Ok(content(5, None, vec![raw_item("text")])));
        backend
            .expect_menu_items()
            .returning(|_, _| Ok(vec![content(5, None, vec![])]));
        let (engine, channel) = engine(backend);
        let state = State::ContentView {
            content_id: 5,
            title: "Материал 5".to_string(),
        };

        let next = engine.handle(state, &press("back")).await;

        assert_eq!(next, State::SelectedPath { path: None });
        assert_eq!(channel.texts(), vec![views::GO_TO_SECTION]);
    }

    #[tokio::test]
    async fn test_back_at_top_level_goes_home() {
        let (engine, channel) = engine(quiet_backend());
        let state = State::MenuNavigation {
            current: 1,
            parent_id: None,
        };

        let next = engine.handle(state, &press("back")).await;

        assert_eq!(next, State::MainMenu);
        assert_eq!(channel.texts().len(), 1);
    }

    #[tokio::test]
    async fn test_search_remembers_origin() {
        let (engine, _channel) = engine(quiet_backend());
        let state = State::ContentView {
            content_id: 8,
            title: "Материал 8".to_string(),
        };

        let next = engine.handle(state, &press("search")).await;

        assert_eq!(
            next,
            State::SearchWaiting {
                query: None,
                return_to: Some(8)
            }
        );
    }

    #[tokio::test]
    async fn test_short_query_reprompts() {
        let (engine, channel) = engine(quiet_backend());
        let state = State::SearchWaiting {
            query: None,
            return_to: None,
        };

        let next = engine.handle(state.clone(), &text(" a ")).await;

        assert_eq!(next, state);
        assert_eq!(channel.texts(), vec![views::SEARCH_TOO_SHORT]);
    }

    #[tokio::test]
    async fn test_pagination_without_query_expired() {
        let (engine, channel) = engine(quiet_backend());
        let state = State::SearchWaiting {
            query: None,
            return_to: None,
        };

        let next = engine.handle(state.clone(), &press("search_page_2")).await;

        assert_eq!(next, state);
        assert_eq!(channel.alerts(), vec![views::SEARCH_EXPIRED_ALERT]);
    }

    #[tokio::test]
    async fn test_question_bounds() {
        let mut backend = quiet_backend();
        backend
            .expect_submit_question()
            .withf(|user, question| *user == USER && question == "abcdefghij")
            .times(1)
            .returning(|_, _| Ok(()));
        let (engine, channel) = engine(backend);

        let next = engine.handle(State::QuestionInput, &text("abcdefghi")).await;
        assert_eq!(next, State::QuestionInput);
        assert_eq!(channel.texts(), vec![views::QUESTION_TOO_SHORT]);

        let next = engine.handle(State::QuestionInput, &text("abcdefghij")).await;
        assert_eq!(next, State::MainMenu);
        assert_eq!(channel.texts()[1], views::QUESTION_SENT);
    }

    #[tokio::test]
    async fn test_question_failure_still_resets() {
        let mut backend = quiet_backend();
        backend
            .expect_submit_question()
            .returning(|_, _| Err(ApiError::Transport("timeout".to_string())));
        let (engine, channel) = engine(backend);

        let next = engine
            .handle(State::QuestionInput, &text("Как подобрать аппарат?"))
            .await;

        assert_eq!(next, State::MainMenu);
        assert_eq!(channel.texts(), vec![views::QUESTION_FAILED]);
    }

    #[tokio::test]
    async fn test_rate_outside_rating_flow() {
        let (engine, channel) = engine(quiet_backend());

        let next = engine.handle(State::MainMenu, &press("rate_5")).await;

        assert_eq!(next, State::MainMenu);
        assert_eq!(channel.alerts(), vec![views::RATING_CONTEXT_ALERT]);
    }

    #[tokio::test]
    async fn test_invalid_stars_rejected() {
        let (engine, channel) = engine(quiet_backend());
        let state = State::RatingWaiting {
            content_id: 5,
            title: "Материал 5".to_string(),
        };

        for data in ["rate_0", "rate_6"] {
            let next = engine.handle(state.clone(), &press(data)).await;
            assert_eq!(next, state);
        }
        let next = engine.handle(state.clone(), &text("x")).await;
        assert_eq!(next, state);

        assert_eq!(
            channel.alerts(),
            vec![views::INVALID_RATING_ALERT, views::INVALID_RATING_ALERT]
        );
        assert_eq!(channel.texts(), vec![views::RATING_PROMPT_AGAIN]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rating_success_pauses_then_returns() {
        let mut backend = quiet_backend();
        backend
            .expect_submit_rating()
            .with(eq(USER), eq(5_i64), eq(4_u8))
            .times(1)
            .returning(|_, _, _| Ok(()));
        let (engine, channel) = engine(backend);
        let state = State::RatingWaiting {
            content_id: 5,
            title: "Материал 5".to_string(),
        };

        let started = tokio::time::Instant::now();
        let next = engine.handle(state, &press("rate_4")).await;

        assert!(started.elapsed() >= Duration::from_millis(2000));
        assert_eq!(
            next,
            State::ContentView {
                content_id: 5,
                title: "Материал 5".to_string()
            }
        );
        let texts = channel.texts();
        assert!(texts[0].contains("Очень полезен"));
        assert_eq!(texts[1], "📄 Материал: Материал 5");
    }

    #[tokio::test]
    async fn test_rating_failure_offers_way_back() {
        let mut backend = quiet_backend();
        backend
            .expect_submit_rating()
            .returning(|_, _, _| Err(ApiError::Transport("down".to_string())));
        let (engine, channel) = engine(backend);
        let state = State::RatingWaiting {
            content_id: 5,
            title: "Материал 5".to_string(),
        };

        let next = engine.handle(state, &text("3")).await;

        assert!(matches!(next, State::ContentView { content_id: 5, .. }));
        assert_eq!(channel.texts(), vec![views::RATING_FAILED]);
    }

    #[tokio::test]
    async fn test_unknown_callback_alerts() {
        let (engine, channel) = engine(quiet_backend());

        let next = engine.handle(State::QuestionInput, &press("retry_no_loop")).await;

        assert_eq!(next, State::QuestionInput);
        assert_eq!(channel.alerts(), vec![views::INVALID_DATA_ALERT]);
        assert_eq!(answers(&channel), 1);
    }

    #[tokio::test]
    async fn test_free_text_while_browsing_hints() {
        let (engine, channel) = engine(quiet_backend());
        let state = State::MenuNavigation {
            current: 2,
            parent_id: Some(1),
        };

        let next = engine.handle(state.clone(), &text("привет")).await;

        assert_eq!(next, state);
        assert_eq!(channel.texts(), vec![views::USE_MENU_HINT]);
    }
}
