//! Dispatcher wiring and the bot's lifetime.
//!
//! Updates are routed per user, so one user is handled sequentially while
//! different users run concurrently. Each endpoint refreshes the sender's
//! registration, runs the session engine and stores the returned state.

use super::handlers::{
    callback_event, callback_registration, get_user_id_safe, message_event, message_registration,
    session_key, Command,
};
use super::telegram::TelegramChannel;
use crate::activity::UserRegistry;
use crate::api::Backend;
use crate::channel::Channel;
use crate::config::Settings;
use crate::reminder::ReminderScheduler;
use crate::session::{EventKind, SessionEngine, State};
use std::sync::Arc;
use std::time::Duration;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use teloxide::utils::command::BotCommands;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Dialogue storing each user's [`State`]
pub type CatalogDialogue = Dialogue<State, InMemStorage<State>>;

const REGISTRY_CAPACITY: u64 = 10_000;

/// Attach the sender's dialogue and stored state.
///
/// Sessions belong to users, so the dialogue is keyed by the sender's id
/// rather than the chat. In private chats both are the same.
fn enter_user_dialogue() -> UpdateHandler<teloxide::RequestError> {
    dptree::filter_map(|storage: Arc<InMemStorage<State>>, update: Update| {
        let user_id = session_key(&update)?;
        Some(CatalogDialogue::new(storage, ChatId(user_id.0.cast_signed())))
    })
    .filter_map_async(|dialogue: CatalogDialogue| async move {
        match dialogue.get().await {
            Ok(state) => Some(state.unwrap_or_default()),
            Err(e) => {
                error!(key = ?dialogue.chat_id(), error = %e, "Failed to load session state");
                None
            }
        }
    })
}

/// Route commands, text and button presses to the session engine
#[must_use]
pub fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .chain(enter_user_dialogue())
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_command),
                )
                .branch(dptree::filter(|msg: Message| msg.text().is_some()).endpoint(handle_text)),
        )
        .branch(
            Update::filter_callback_query()
                .chain(enter_user_dialogue())
                .endpoint(handle_callback),
        )
}

async fn store(dialogue: &CatalogDialogue, user_id: i64, next: State) {
    if let Err(e) = dialogue.update(next).await {
        error!(user_id = user_id, error = %e, "Failed to store session state");
    }
}

async fn handle_command(
    msg: Message,
    cmd: Command,
    update: Update,
    state: State,
    dialogue: CatalogDialogue,
    engine: Arc<SessionEngine>,
    registry: Arc<UserRegistry>,
) -> Result<(), teloxide::RequestError> {
    let user_id = get_user_id_safe(&msg);
    if let Some(payload) = message_registration(update.id.0, &msg) {
        registry.refresh(user_id, &payload).await;
    }

    let kind = match cmd {
        Command::Start => EventKind::Start,
    };
    let next = engine.handle(state, &message_event(&msg, kind)).await;
    store(&dialogue, user_id, next).await;
    respond(())
}

async fn handle_text(
    msg: Message,
    update: Update,
    state: State,
    dialogue: CatalogDialogue,
    engine: Arc<SessionEngine>,
    registry: Arc<UserRegistry>,
) -> Result<(), teloxide::RequestError> {
    let user_id = get_user_id_safe(&msg);
    if let Some(payload) = message_registration(update.id.0, &msg) {
        registry.refresh(user_id, &payload).await;
    }

    let Some(text) = msg.text() else {
        return respond(());
    };
    let event = message_event(&msg, EventKind::Text(text.to_string()));
    let next = engine.handle(state, &event).await;
    store(&dialogue, user_id, next).await;
    respond(())
}

async fn handle_callback(
    q: CallbackQuery,
    update: Update,
    state: State,
    dialogue: CatalogDialogue,
    engine: Arc<SessionEngine>,
    registry: Arc<UserRegistry>,
) -> Result<(), teloxide::RequestError> {
    let user_id = q.from.id.0.cast_signed();
    registry
        .refresh(user_id, &callback_registration(update.id.0, &q))
        .await;

    let Some(event) = callback_event(&q) else {
        debug!(user_id = user_id, "Callback without data acknowledged");
        engine.acknowledge(&q.id.0).await;
        return respond(());
    };
    let next = engine.handle(state, &event).await;
    store(&dialogue, user_id, next).await;
    respond(())
}

/// Run the bot until ctrl-c, with the reminder scheduler alongside
pub async fn run_bot(settings: Arc<Settings>, backend: Arc<dyn Backend>) {
    let bot = Bot::new(settings.telegram_token.clone());
    let channel: Arc<dyn Channel> = Arc::new(TelegramChannel::new(bot.clone()));

    let engine = Arc::new(SessionEngine::new(
        backend.clone(),
        channel.clone(),
        &settings,
    ));
    let registry = Arc::new(UserRegistry::new(
        backend.clone(),
        Duration::from_secs(settings.registration_refresh_secs),
        REGISTRY_CAPACITY,
    ));

    let cancel = CancellationToken::new();
    let scheduler = if settings.reminders_enabled {
        let scheduler = ReminderScheduler::new(backend, channel, &settings);
        let token = cancel.clone();
        Some(tokio::spawn(async move { scheduler.run(token).await }))
    } else {
        info!("Reminders disabled");
        None
    };

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!(error = %e, "Failed to register bot commands");
    }

    info!("Bot is running...");

    Dispatcher::builder(bot, setup_handler())
        .dependencies(dptree::deps![InMemStorage::<State>::new(), engine, registry])
        .distribution_function(session_key)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Dispatcher stopped, shutting down");
    cancel.cancel();
    if let Some(handle) = scheduler {
        if let Err(e) = handle.await {
            error!(error = %e, "Reminder scheduler task failed");
        }
    }
}
