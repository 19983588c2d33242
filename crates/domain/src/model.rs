//! Domain models and value objects

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A post fetched from the watched feed (RSS mirror or timeline API)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    /// Source-specific post ID (opaque; only compared for equality)
    pub id: String,
    /// Post text content
    pub text: String,
    /// When the post was published (UTC)
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
    /// URL to the original post
    pub permalink: String,
}

/// Dedup state: the id of the most recently delivered post.
///
/// Held in process memory only; resets to unset on restart, which re-delivers
/// the latest post once on the next boot. That is accepted behavior.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursor {
    pub last_id: Option<String>,
}

impl Cursor {
    /// Cursor that has not seen any post yet
    pub fn unset() -> Self {
        Self { last_id: None }
    }

    pub fn at(id: impl Into<String>) -> Self {
        Self {
            last_id: Some(id.into()),
        }
    }

    pub fn is_unset(&self) -> bool {
        self.last_id.is_none()
    }
}

/// Result of translating a post's text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    /// Text translated inline by a translation service
    Inline(String),
    /// Links to external translator tools instead of translated text
    Links(Vec<TranslatorLink>),
}

/// A named link to an external translator pre-filled with the post text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatorLink {
    pub name: String,
    pub url: String,
}

/// Per-cycle summary, used for logging only
#[derive(Debug, Clone, Copy, Default)]
pub struct RelayReport {
    /// Messages delivered to the channel this cycle
    pub delivered: usize,
    /// Posts whose translation or delivery failed this cycle
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_starts_unset() {
        let cursor = Cursor::unset();
        assert!(cursor.is_unset());
        assert_eq!(cursor, Cursor::default());
    }

    #[test]
    fn cursor_at_holds_id() {
        let cursor = Cursor::at("1234");
        assert!(!cursor.is_unset());
        assert_eq!(cursor.last_id.as_deref(), Some("1234"));
    }
}
