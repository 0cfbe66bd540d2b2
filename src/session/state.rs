//! Conversation states

use super::action::PathKind;
use serde::{Deserialize, Serialize};

/// Where a user is in the conversation.
///
/// Each state carries exactly the context it needs, so a state without its
/// context cannot be built.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum State {
    /// Welcome screen with the path choice
    #[default]
    MainMenu,
    /// Root listing shown after a path was chosen
    SelectedPath {
        /// Chosen path, `None` when reached from a root-level material
        path: Option<PathKind>,
    },
    /// Children of `current` shown
    MenuNavigation {
        /// Node whose children are listed
        current: i64,
        /// Its parent, `None` at root level
        parent_id: Option<i64>,
    },
    /// A content node shown
    ContentView {
        /// Shown node
        content_id: i64,
        /// Its title
        title: String,
    },
    /// Waiting for a query, or showing its results
    SearchWaiting {
        /// Last accepted query, replayed by pagination
        query: Option<String>,
        /// Node the search was started from
        return_to: Option<i64>,
    },
    /// Waiting for a question text
    QuestionInput,
    /// Waiting for 1..=5 stars
    RatingWaiting {
        /// Node being rated
        content_id: i64,
        /// Its title
        title: String,
    },
}

impl State {
    /// Node the user is looking at, if any
    #[must_use]
    pub const fn current_node(&self) -> Option<i64> {
        match self {
            Self::MenuNavigation { current, .. } => Some(*current),
            Self::ContentView { content_id, .. } | Self::RatingWaiting { content_id, .. } => {
                Some(*content_id)
            }
            Self::SearchWaiting { return_to, .. } => *return_to,
            Self::MainMenu | Self::SelectedPath { .. } | Self::QuestionInput => None,
        }
    }

    /// Short name for logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MainMenu => "main_menu",
            Self::SelectedPath { .. } => "selected_path",
            Self::MenuNavigation { .. } => "menu_navigation",
            Self::ContentView { .. } => "content_view",
            Self::SearchWaiting { .. } => "search_waiting",
            Self::QuestionInput => "question_input",
            Self::RatingWaiting { .. } => "rating_waiting",
        }
    }
}
