//! Catalog search with page-wise presentation
//!
//! The service has no offset parameter and no total count, so page `n` is
//! fetched with `limit = page_size * n` and sliced locally. The page count
//! is derived from that limited result, which under-reports pages when more
//! hits exist beyond the fetch limit.

use crate::api::models::SearchResult;
use crate::api::{ApiError, Backend};
use crate::utils::{ellipsize, escape_html};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::debug;

const DESCRIPTION_PREVIEW_CHARS: usize = 100;

/// One page of a search, with everything fetched to build it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPage {
    /// Query as typed
    pub query: String,
    /// 1-based page number
    pub page: usize,
    /// Hits per page
    pub page_size: usize,
    /// Everything the service returned for this page's limit
    pub fetched: Vec<SearchResult>,
}

impl SearchPage {
    /// Hits shown on this page
    #[must_use]
    pub fn items(&self) -> &[SearchResult] {
        let start = self.page.saturating_sub(1).saturating_mul(self.page_size);
        let end = start.saturating_add(self.page_size).min(self.fetched.len());
        self.fetched.get(start..end).unwrap_or_default()
    }

    /// `ceil(fetched / page_size)`
    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.fetched.len().div_ceil(self.page_size.max(1))
    }

    /// Nothing to show on this page
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    /// HTML body of the result message, numbered from 1 on every page
    #[must_use]
    pub fn render_text(&self) -> String {
        if self.is_empty() {
            return format!(
                "😔 По запросу «{}» ничего не найдено.\n\n\
                 Попробуйте изменить формулировку или использовать синонимы.",
                escape_html(&self.query)
            );
        }

        let mut text = format!("🔍 Результаты поиска «{}»:\n\n", escape_html(&self.query));
        for (index, hit) in self.items().iter().enumerate() {
            let _ = writeln!(text, "{}. {}", index + 1, escape_html(&hit.title));
            if let Some(description) = hit.description.as_deref().filter(|d| !d.is_empty()) {
                let _ = writeln!(
                    text,
                    "   {}",
                    escape_html(&ellipsize(description, DESCRIPTION_PREVIEW_CHARS))
                );
            }
            text.push('\n');
        }
        text
    }
}

/// Runs searches against the service
#[derive(Clone)]
pub struct SearchEngine {
    backend: Arc<dyn Backend>,
    page_size: usize,
}

impl SearchEngine {
    /// Create a search engine showing `page_size` hits per page
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, page_size: usize) -> Self {
        Self {
            backend,
            page_size: page_size.max(1),
        }
    }

    /// Configured hits per page
    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    /// Hits of one page, at most `page_size` of them
    ///
    /// # Errors
    ///
    /// Returns the service error.
    pub async fn search(
        &self,
        user_id: i64,
        query: &str,
        page_size: usize,
        page: usize,
    ) -> Result<Vec<SearchResult>, ApiError> {
        Ok(self
            .fetch(user_id, query, page_size, page)
            .await?
            .items()
            .to_vec())
    }

    /// Page `page` with the configured page size
    ///
    /// # Errors
    ///
    /// Returns the service error.
    pub async fn page(&self, user_id: i64, query: &str, page: usize) -> Result<SearchPage, ApiError> {
        self.fetch(user_id, query, self.page_size, page).await
    }

    async fn fetch(
        &self,
        user_id: i64,
        query: &str,
        page_size: usize,
        page: usize,
    ) -> Result<SearchPage, ApiError> {
        let page_size = page_size.max(1);
        let page = page.max(1);
        let fetched = self
            .backend
            .search(user_id, query, page_size.saturating_mul(page))
            .await?;
        debug!(user_id = user_id, page = page, hits = fetched.len(), "Search fetched");

        Ok(SearchPage {
            query: query.to_string(),
            page,
            page_size,
            fetched,
        })
    }
}
