//! Conversion of Telegram updates into session events and registration payloads

use crate::session::{EventKind, InboundEvent};
use serde_json::{json, Value};
use teloxide::prelude::*;
use teloxide::types::{User, UserId};
use teloxide::utils::command::BotCommands;

/// Bot commands
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Поддерживаемые команды:")]
pub enum Command {
    /// Reset the conversation and show the main menu
    #[command(description = "Начать сначала.")]
    Start,
}

/// Safe extraction of user ID from a message.
/// Returns 0 if the user information is missing.
#[must_use]
pub fn get_user_id_safe(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

/// Key of the session an update belongs to: its sender.
///
/// Also used as the dispatcher's distribution key, so one user's updates are
/// handled in order even across chats.
#[must_use]
pub fn session_key(update: &Update) -> Option<UserId> {
    update.from().map(|user| user.id)
}

/// Event for a message
#[must_use]
pub fn message_event(msg: &Message, kind: EventKind) -> InboundEvent {
    InboundEvent {
        user_id: get_user_id_safe(msg),
        chat_id: msg.chat.id.0,
        kind,
    }
}

/// Event for a button press, `None` without callback data
#[must_use]
pub fn callback_event(q: &CallbackQuery) -> Option<InboundEvent> {
    let data = q.data.clone()?;
    let user_id = q.from.id.0.cast_signed();
    let message = q.message.as_ref();
    Some(InboundEvent {
        user_id,
        chat_id: message.map_or(user_id, |m| m.chat().id.0),
        kind: EventKind::Action {
            id: q.id.0.clone(),
            message_id: message.map(|m| m.id().0),
            data,
        },
    })
}

fn user_json(user: &User) -> Value {
    json!({
        "id": user.id.0,
        "is_bot": user.is_bot,
        "first_name": user.first_name,
        "last_name": user.last_name,
        "username": user.username,
        "language_code": user.language_code,
    })
}

/// Registration body for a message update
#[must_use]
pub fn message_registration(update_id: u32, msg: &Message) -> Option<Value> {
    let user = msg.from.as_ref()?;
    Some(json!({
        "update_id": update_id,
        "message": {
            "message_id": msg.id.0,
            "from": user_json(user),
            "chat": { "id": msg.chat.id.0 },
            "date": msg.date.timestamp(),
            "text": msg.text(),
        },
    }))
}

/// Registration body for a callback update
#[must_use]
pub fn callback_registration(update_id: u32, q: &CallbackQuery) -> Value {
    json!({
        "update_id": update_id,
        "callback_query": {
            "id": q.id.0,
            "from": user_json(&q.from),
            "data": q.data,
        },
    })
}
