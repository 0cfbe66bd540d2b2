//! Content service access
//!
//! [`ApiClient`] is the single call primitive (timeout, retry with backoff,
//! error classification). [`Backend`] lists the typed endpoints the rest of
//! the bot uses.

mod backend;
mod client;
/// Wire models exchanged with the content service
pub mod models;

pub use backend::Backend;
#[cfg(test)]
pub use backend::MockBackend;
pub use client::{ApiClient, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
#[cfg(test)]
pub use client::MockHttpTransport;

use thiserror::Error;

/// Errors returned by the content service client
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Connection, timeout or broken body; retries already exhausted
    #[error("Transport error: {0}")]
    Transport(String),
    /// Well-formed error response from the service
    #[error("API error {status}: {message}")]
    Client {
        /// HTTP status code
        status: u16,
        /// `detail` field of the response, or a shortened body
        message: String,
    },
    /// A successful response did not match the expected shape
    #[error("Decode error: {0}")]
    Decode(String),
}

impl ApiError {
    /// `true` for a 404 answer
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Client { status: 404, .. })
    }

    /// Only transport failures are worth another attempt
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
