//! Catalog tree lookups
//!
//! Thin layer over [`Backend`] that turns a 404 into an explicit
//! [`Lookup::NotFound`] so callers can tell "gone" from "broken".

use crate::api::models::MenuNode;
use crate::api::{ApiError, Backend};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Result of a lookup that may legitimately find nothing
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// Found
    Found(T),
    /// The service does not know the id
    NotFound,
}

/// Catalog lookups failed for a reason other than not-found
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("catalog unavailable: {0}")]
pub struct NavigatorError(#[from] pub ApiError);

/// Reads the menu tree on demand, never caches
#[derive(Clone)]
pub struct MenuNavigator {
    backend: Arc<dyn Backend>,
}

impl MenuNavigator {
    /// Create a navigator
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Children of `parent_id` (root level for `None`) in service order
    ///
    /// # Errors
    ///
    /// Returns `NavigatorError` on any service failure.
    pub async fn list_children(
        &self,
        user_id: i64,
        parent_id: Option<i64>,
    ) -> Result<Vec<MenuNode>, NavigatorError> {
        let nodes = self.backend.menu_items(user_id, parent_id).await?;
        debug!(user_id = user_id, parent_id = ?parent_id, count = nodes.len(), "Menu listing fetched");
        Ok(nodes)
    }

    /// A node with its children and content files
    ///
    /// # Errors
    ///
    /// Returns `NavigatorError` on any service failure except not-found.
    pub async fn get_content(
        &self,
        user_id: i64,
        node_id: i64,
    ) -> Result<Lookup<MenuNode>, NavigatorError> {
        match self.backend.menu_content(user_id, node_id).await {
            Ok(node) => Ok(Lookup::Found(node)),
            Err(e) if e.is_not_found() => {
                debug!(user_id = user_id, node_id = node_id, "Menu node not found");
                Ok(Lookup::NotFound)
            }
            Err(e) => Err(e.into()),
        }
    }
}
