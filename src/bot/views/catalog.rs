//! Catalog UI: texts and inline keyboards.

use crate::api::models::MenuNode;
use crate::search::SearchPage;
use crate::session::action::{Action, PathKind};
use crate::utils::{escape_html, truncate_str};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

// ─────────────────────────────────────────────────────────────────────────────
// Limits
// ─────────────────────────────────────────────────────────────────────────────

const MENU_BUTTON_CHARS: usize = 64;
const SEARCH_BUTTON_CHARS: usize = 50;

// ─────────────────────────────────────────────────────────────────────────────
// Texts
// ─────────────────────────────────────────────────────────────────────────────

/// Generic failure text, never carries error details
pub const ERROR_MESSAGE: &str =
    "😔 К сожалению, произошла ошибка. Попробуйте еще раз или обратитесь к администратору.";
/// Short alert after a failure
pub const ERROR_ALERT: &str = "Произошла ошибка";
/// Unknown callback data
pub const INVALID_DATA_ALERT: &str = "Неверный формат данных";
/// Node missing on the service
pub const NOT_FOUND_ALERT: &str = "Пункт меню не найден";
/// Content node missing when rating
pub const MATERIAL_NOT_FOUND_ALERT: &str = "Материал не найден";
/// Navigation node without children
pub const NO_SUBSECTIONS_ALERT: &str = "Нет доступных подразделов";
/// Root listing empty
pub const MATERIALS_UNAVAILABLE_ALERT: &str = "Материалы недоступны";
/// Pagination without a stored query
pub const SEARCH_EXPIRED_ALERT: &str = "Результаты поиска устарели";
/// Empty result placeholder pressed
pub const NO_RESULTS_ALERT: &str = "Результаты не найдены";
/// Stars outside 1..=5
pub const INVALID_RATING_ALERT: &str = "Неверная оценка";
/// Stars pressed outside the rating flow
pub const RATING_CONTEXT_ALERT: &str = "Ошибка контекста оценки";

/// Root listing empty
pub const MATERIALS_UNAVAILABLE: &str =
    "😔 К сожалению, в данный момент материалы недоступны. Попробуйте позже или обратитесь к администратору.";
/// Default heading of a submenu
pub const CHOOSE_SECTION: &str = "📁 Выберите раздел:";
/// Heading of a parent listing reached from content
pub const GO_TO_SECTION: &str = "📁 Перейдите к нужному разделу:";
/// Free text outside an input flow
pub const USE_MENU_HINT: &str = "📝 Используйте кнопки меню для навигации:";

/// Prompt for a search query
pub const SEARCH_PROMPT: &str =
    "🔍 Введите поисковый запрос:\n\nНапример: слуховые аппараты, диагностика, развитие речи";
/// Query below two characters
pub const SEARCH_TOO_SHORT: &str = "Поисковый запрос должен содержать минимум 2 символа";
/// Search request failed
pub const SEARCH_FAILED: &str = "😔 Произошла ошибка при поиске. Попробуйте позже.";

/// Prompt for a question
pub const QUESTION_PROMPT: &str = "❓ Задайте свой вопрос:\n\n\
Мы понимаем, что у вас могут быть важные вопросы о слухе вашего ребенка или собственном слухе. \
Опишите вашу ситуацию как можно подробнее, и наши специалисты обязательно ответят.\n\n\
📝 Введите ваш вопрос (до 2000 символов):\n\
⬅️ Для отмены используйте команду /start";
/// Question below ten characters
pub const QUESTION_TOO_SHORT: &str =
    "📝 Вопрос слишком короткий. Пожалуйста, напишите более подробно (минимум 10 символов).";
/// Question above 2000 characters
pub const QUESTION_TOO_LONG: &str =
    "📝 Вопрос слишком длинный. Пожалуйста, сократите его до 2000 символов.";
/// Spam-like question
pub const QUESTION_TRIVIAL: &str = "📝 Пожалуйста, введите осмысленный вопрос. \
Избегайте избыточного количества повторяющихся символов.";
/// Question stored
pub const QUESTION_SENT: &str = "✅ Ваш вопрос успешно отправлен!\n\n\
📨 Наши специалисты рассмотрят ваш вопрос и обязательно ответят в ближайшее время. Спасибо за доверие!\n\n\
🔄 Если у вас есть еще вопросы, можете задать их через соответствующую кнопку в меню.";
/// Question not stored
pub const QUESTION_FAILED: &str =
    "😔 Произошла ошибка при отправке вопроса. Попробуйте позже или обратитесь к администратору.";

/// Typed rating outside 1..=5
pub const RATING_PROMPT_AGAIN: &str = "⭐ Выберите оценку от 1 до 5 с помощью кнопок ниже.";
/// Rating not stored
pub const RATING_FAILED: &str = "😔 Произошла ошибка при сохранении оценки. Попробуйте позже.";

// ─────────────────────────────────────────────────────────────────────────────
// Formatters
// ─────────────────────────────────────────────────────────────────────────────

/// Greeting with the path choice
#[must_use]
pub fn welcome_text(welcome: &str) -> String {
    format!(
        "{welcome}\n\nМы понимаем, как важно для вас найти правильные ответы на вопросы о слухе. \
         Выберите направление, которое вас интересует, и мы поможем найти нужную информацию."
    )
}

/// Heading of the root listing after a path was chosen
#[must_use]
pub fn path_selected_text(path: PathKind) -> String {
    let whose = match path {
        PathKind::Child => "ребенка",
        PathKind::Adult => "своего",
    };
    format!("✅ Вы выбрали направление: {whose} слухе\n\n🔍 Теперь выберите раздел, который вас интересует:")
}

/// Heading of a submenu, the node's own message if it has one
#[must_use]
pub fn submenu_text(node: &MenuNode) -> String {
    node.bot_message
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .map_or_else(|| CHOOSE_SECTION.to_string(), escape_html)
}

/// Rating prompt for a material
#[must_use]
pub fn rating_prompt(title: &str) -> String {
    format!(
        "⭐ Оцените полезность материала «{}»:\n\n\
         Выберите оценку от 1 до 5 звезд:\n\
         1 ⭐ - {}\n2 ⭐⭐ - {}\n3 ⭐⭐⭐ - {}\n4 ⭐⭐⭐⭐ - {}\n5 ⭐⭐⭐⭐⭐ - {}",
        escape_html(title),
        rating_word(1),
        rating_word(2),
        rating_word(3),
        rating_word(4),
        rating_word(5),
    )
}

/// Verbal meaning of a star count
#[must_use]
pub const fn rating_word(stars: u8) -> &'static str {
    match stars {
        1 => "Не полезен",
        2 => "Мало полезен",
        3 => "Умеренно полезен",
        4 => "Очень полезен",
        _ => "Исключительно полезен",
    }
}

/// Confirmation of a stored rating
#[must_use]
pub fn rating_thanks(stars: u8) -> String {
    format!(
        "✅ Спасибо за вашу оценку!\n\nМатериал оценен как: {}\n\n\
         Ваше мнение поможет нам улучшить качество материалов.",
        rating_word(stars)
    )
}

/// Heading of a content node after the rating flow
#[must_use]
pub fn material_heading(title: &str) -> String {
    format!("📄 Материал: {}", escape_html(title))
}

// ─────────────────────────────────────────────────────────────────────────────
// Keyboards
// ─────────────────────────────────────────────────────────────────────────────

fn button(text: impl Into<String>, action: Action) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, action.data())
}

fn search_button() -> InlineKeyboardButton {
    button("🔍 Поиск", Action::Search)
}

fn question_button() -> InlineKeyboardButton {
    button("❓ Задать вопрос", Action::AskQuestion)
}

fn home_button() -> InlineKeyboardButton {
    button("🏠 Главное меню", Action::Home)
}

fn column(buttons: Vec<InlineKeyboardButton>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(buttons.into_iter().map(|b| vec![b]))
}

/// Path choice, search and question
#[must_use]
pub fn main_menu_keyboard() -> InlineKeyboardMarkup {
    column(vec![
        button("🧸 Я волнуюсь о слухе ребенка", Action::Path(PathKind::Child)),
        button("👤 Я волнуюсь о своем слухе", Action::Path(PathKind::Adult)),
        search_button(),
        question_button(),
    ])
}

/// One button per node, then search, question, back and home
#[must_use]
pub fn menu_keyboard(nodes: &[MenuNode]) -> InlineKeyboardMarkup {
    let mut buttons: Vec<_> = nodes
        .iter()
        .map(|node| {
            let icon = if node.is_navigation() { "📂" } else { "📄" };
            let label = truncate_str(format!("{icon} {}", node.title), MENU_BUTTON_CHARS);
            button(label, Action::Menu(node.id))
        })
        .collect();
    buttons.extend([
        search_button(),
        question_button(),
        button("⬅️ Назад", Action::Back),
        home_button(),
    ]);
    column(buttons)
}

/// Actions under a shown material
#[must_use]
pub fn content_actions_keyboard(content_id: i64) -> InlineKeyboardMarkup {
    column(vec![
        button("⭐ Оценить материал", Action::ContentRating(content_id)),
        search_button(),
        question_button(),
        button("⬅️ Назад", Action::ContentMenu(content_id)),
        home_button(),
    ])
}

/// Five stars in a row and a cancel button back to the material's menu
#[must_use]
pub fn rating_keyboard(content_id: i64) -> InlineKeyboardMarkup {
    let stars = (1..=5)
        .map(|i| button(format!("⭐ {i}"), Action::Rate(i)))
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(vec![
        stars,
        vec![button("❌ Отмена", Action::ContentMenu(content_id))],
    ])
}

/// Hits, pagination and the way out
#[must_use]
pub fn search_results_keyboard(page: &SearchPage) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = if page.is_empty() {
        vec![vec![button("📝 Результаты не найдены", Action::NoResults)]]
    } else {
        page.items()
            .iter()
            .enumerate()
            .map(|(index, hit)| {
                let label = format!("{}. {}", index + 1, truncate_str(&hit.title, SEARCH_BUTTON_CHARS));
                vec![button(label, Action::SearchResult(hit.id))]
            })
            .collect()
    };

    let total = page.total_pages();
    if total > 1 {
        let mut pagination = Vec::with_capacity(3);
        if page.page > 1 {
            pagination.push(button("⬅️", Action::SearchPage(page.page - 1)));
        }
        pagination.push(button(format!("{}/{total}", page.page), Action::SearchInfo));
        if page.page < total {
            pagination.push(button("➡️", Action::SearchPage(page.page + 1)));
        }
        rows.push(pagination);
    }

    rows.extend(
        [
            button("🔍 Новый поиск", Action::Search),
            question_button(),
            button("⬅️ Назад", Action::Back),
            home_button(),
        ]
        .into_iter()
        .map(|b| vec![b]),
    );
    InlineKeyboardMarkup::new(rows)
}

/// Only the way home
#[must_use]
pub fn home_keyboard() -> InlineKeyboardMarkup {
    column(vec![home_button()])
}

/// Home and search, under hints and errors
#[must_use]
pub fn recovery_keyboard() -> InlineKeyboardMarkup {
    column(vec![home_button(), search_button()])
}

/// A way back to a material after a failed rating
#[must_use]
pub fn back_to_material_keyboard(content_id: i64) -> InlineKeyboardMarkup {
    column(vec![
        button("⬅️ Назад", Action::ContentMenu(content_id)),
        home_button(),
    ])
}
