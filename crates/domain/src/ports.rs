//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::model::{Post, Translation};

/// Error type for feed source operations.
///
/// Every variant is recoverable: the relay loop logs it, leaves the cursor
/// untouched, and retries on the next tick.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("All {0} mirror endpoints failed")]
    Exhausted(usize),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("API error: {0}")]
    Api(String),
}

/// Port for fetching posts from the watched feed
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the most recent posts, newest first.
    ///
    /// Sources that support incremental queries (timeline APIs) only return
    /// posts newer than `since_id`; syndication sources ignore it and return
    /// the whole feed window, leaving dedup to the cursor filter.
    async fn fetch_latest(&self, since_id: Option<&str>) -> Result<Vec<Post>, FetchError>;

    /// Short source name for log context (e.g., "rss", "timeline")
    fn name(&self) -> &'static str;
}

/// Error type for translation operations (per-post, recovered by skipping)
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Translation service error: {0}")]
    Service(String),
    #[error("Unexpected response format: {0}")]
    InvalidFormat(String),
}

/// Port for translating post text to the target language
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str) -> Result<Translation, TranslationError>;
}

/// Error type for message delivery
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Channel {id} could not be resolved: {message}")]
    ChannelResolution { id: u64, message: String },
    #[error("API error: {0}")]
    Api(String),
}

/// Port for delivering messages to the fixed destination channel
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Send one message to the destination channel resolved at startup
    async fn send(&self, text: &str) -> Result<(), DeliveryError>;
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> OffsetDateTime;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
