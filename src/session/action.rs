//! Callback data grammar shared by keyboards and the engine

use lazy_regex::{lazy_regex, Lazy};
use regex::Regex;

/// `{prefix}_{number}` callback payloads
static RE_NUMBERED: Lazy<Regex> =
    lazy_regex!(r"^(menu|content_menu|search_page|search_result|content_rating|rate)_(-?\d+)$");

/// Which top-level path was chosen on the main menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PathKind {
    /// Concerned about a child's hearing
    Child,
    /// Concerned about one's own hearing
    Adult,
}

/// A button press, decoded from its callback data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Back to the main menu from anywhere
    Home,
    /// Top-level path chosen
    Path(PathKind),
    /// Open a node
    Menu(i64),
    /// One level up
    Back,
    /// Leave a content node for its parent's listing
    ContentMenu(i64),
    /// Ask for a search query
    Search,
    /// Page of the current search
    SearchPage(usize),
    /// Open a search hit
    SearchResult(i64),
    /// Ask for a question
    AskQuestion,
    /// Start rating a content node
    ContentRating(i64),
    /// Stars picked on the rating keyboard, kept raw for validation
    Rate(i64),
    /// Page counter button, does nothing
    SearchInfo,
    /// Placeholder button of an empty result list
    NoResults,
}

impl Action {
    /// Decode callback data, `None` for anything unknown
    #[must_use]
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "home" => return Some(Self::Home),
            "path_child" => return Some(Self::Path(PathKind::Child)),
            "path_adult" => return Some(Self::Path(PathKind::Adult)),
            "back" => return Some(Self::Back),
            "search" => return Some(Self::Search),
            "ask_question" => return Some(Self::AskQuestion),
            "search_info" => return Some(Self::SearchInfo),
            "no_results" => return Some(Self::NoResults),
            _ => {}
        }

        let caps = RE_NUMBERED.captures(data)?;
        let number: i64 = caps.get(2)?.as_str().parse().ok()?;
        match caps.get(1)?.as_str() {
            "menu" => Some(Self::Menu(number)),
            "content_menu" => Some(Self::ContentMenu(number)),
            "search_page" => usize::try_from(number).ok().map(Self::SearchPage),
            "search_result" => Some(Self::SearchResult(number)),
            "content_rating" => Some(Self::ContentRating(number)),
            "rate" => Some(Self::Rate(number)),
            _ => None,
        }
    }

    /// Encode as callback data
    #[must_use]
    pub fn data(&self) -> String {
        match self {
            Self::Home => "home".to_string(),
            Self::Path(PathKind::Child) => "path_child".to_string(),
            Self::Path(PathKind::Adult) => "path_adult".to_string(),
            Self::Menu(id) => format!("menu_{id}"),
            Self::Back => "back".to_string(),
            Self::ContentMenu(id) => format!("content_menu_{id}"),
            Self::Search => "search".to_string(),
            Self::SearchPage(page) => format!("search_page_{page}"),
            Self::SearchResult(id) => format!("search_result_{id}"),
            Self::AskQuestion => "ask_question".to_string(),
            Self::ContentRating(id) => format!("content_rating_{id}"),
            Self::Rate(stars) => format!("rate_{stars}"),
            Self::SearchInfo => "search_info".to_string(),
            Self::NoResults => "no_results".to_string(),
        }
    }
}
