//! Typed errors for the crawler library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so the orchestrator can
//! tell transport failures apart from parse failures.

use thiserror::Error;

/// Errors that can occur while crawling an upstream careers site.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// HTTP request failed before a response was received
    #[error("HTTP error for {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Upstream answered with a non-success status
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// Upstream answered with an empty body
    #[error("empty response body from {url}")]
    EmptyResponse { url: String },

    /// Response body was not the expected JSON shape
    #[error("JSON decode error for {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Listing markup could not be interpreted
    #[error("parse error: {0}")]
    Parse(String),

    /// Headless browser failed to launch, navigate, or evaluate
    #[error("browser error: {0}")]
    Browser(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Headless rendering is required but no render service was configured
    #[error("headless rendering unavailable")]
    BrowserUnavailable,

    /// Operation exceeded its time budget
    #[error("timeout after {millis}ms: {operation}")]
    Timeout { operation: String, millis: u64 },

    /// Invalid URL format
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// Invalid client configuration
    #[error("config error: {0}")]
    Config(String),
}

impl CrawlError {
    /// Upstream failures worth retrying: network errors, timeouts, non-200
    /// and malformed responses. Parse and configuration errors are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CrawlError::Http { .. }
                | CrawlError::Status { .. }
                | CrawlError::EmptyResponse { .. }
                | CrawlError::Json { .. }
                | CrawlError::Timeout { .. }
                | CrawlError::Browser(_)
        )
    }
}

/// Result type alias for crawl operations.
pub type CrawlResult<T> = std::result::Result<T, CrawlError>;
