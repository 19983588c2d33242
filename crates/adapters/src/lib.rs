//! feed-relay adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `feed`: RSS mirror and timeline API feed sources
//! - `translate`: inline HTTP translation and translator-link generation
//! - `discord`: delivery sink and inbound message watcher over the REST API

mod rss;
mod timeline;

pub mod discord;
pub mod translate;

/// Re-exports for feed source adapters
pub mod feed {
    pub use crate::rss::{DEFAULT_USER_AGENT, RssFeedSource};
    pub use crate::timeline::TimelineFeedSource;
}
