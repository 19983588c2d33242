//! New-post selection against the dedup cursor

use time::{Duration, OffsetDateTime};

use crate::model::{Cursor, Post};

/// Policy deciding which fetched posts count as "new".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewPostPolicy {
    /// Everything newer than the last delivered post id
    Cursor,
    /// Like `Cursor`, but additionally drop posts published outside the
    /// given recency window relative to fetch time. Used when the source
    /// cannot be queried incrementally by id.
    RecencyWindow(Duration),
}

/// Select which of the fetched posts (newest first) are new, returned in
/// delivery order (oldest first, so messages appear chronologically).
///
/// With an unset cursor only the single newest post is new; this prevents
/// flooding the channel with the feed's full history on first run.
pub fn select_new(
    posts: &[Post],
    cursor: &Cursor,
    policy: NewPostPolicy,
    now: OffsetDateTime,
) -> Vec<Post> {
    let Some(newest) = posts.first() else {
        return vec![];
    };

    let mut new_posts: Vec<Post> = match &cursor.last_id {
        None => vec![newest.clone()],
        Some(last_id) => posts
            .iter()
            .take_while(|p| p.id != *last_id)
            .cloned()
            .collect(),
    };

    if let NewPostPolicy::RecencyWindow(window) = policy {
        new_posts.retain(|p| now - p.published_at <= window);
    }

    new_posts.reverse();
    new_posts
}

/// Advance the cursor to the newest fetched post's id.
///
/// Only called after a successful fetch; an empty fetch leaves the cursor
/// unchanged, so it never points at a post the source did not return.
pub fn advance(cursor: &Cursor, posts: &[Post]) -> Cursor {
    match posts.first() {
        Some(newest) => Cursor::at(newest.id.clone()),
        None => cursor.clone(),
    }
}
