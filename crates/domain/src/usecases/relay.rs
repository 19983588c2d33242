//! Relay loop use case - orchestrates fetch, filter, translate, deliver

use std::sync::Arc;

use crate::{
    model::{Cursor, RelayReport},
    ports::{Clock, FeedSource, FetchError, MessageSink, Translator},
    usecases::{
        filter::{self, NewPostPolicy},
        render::{RenderConfig, Renderer},
    },
};

/// Configuration for the relay loop
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// How "new" posts are selected against the cursor
    pub policy: NewPostPolicy,
    /// Render mode (don't deliver, just log what would be sent)
    pub dry_run: bool,
    /// Render config
    pub render_config: RenderConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            policy: NewPostPolicy::Cursor,
            dry_run: false,
            render_config: RenderConfig::default(),
        }
    }
}

/// Relay loop orchestrator.
///
/// Owns the dedup cursor: the cursor is read once at the start of a cycle
/// and written at most once at its end, and a cycle runs strictly
/// sequentially, so no locking is involved.
pub struct RelayLoop<F, T, S, C>
where
    F: FeedSource + ?Sized,
    T: Translator + ?Sized,
    S: MessageSink + ?Sized,
    C: Clock + ?Sized,
{
    feed: Arc<F>,
    translator: Arc<T>,
    sink: Arc<S>,
    clock: Arc<C>,
    renderer: Renderer,
    config: RelayConfig,
    cursor: Cursor,
}

impl<F, T, S, C> RelayLoop<F, T, S, C>
where
    F: FeedSource + ?Sized,
    T: Translator + ?Sized,
    S: MessageSink + ?Sized,
    C: Clock + ?Sized,
{
    pub fn new(
        feed: Arc<F>,
        translator: Arc<T>,
        sink: Arc<S>,
        clock: Arc<C>,
        config: RelayConfig,
    ) -> Self {
        let renderer = Renderer::new(config.render_config.clone());
        Self {
            feed,
            translator,
            sink,
            clock,
            renderer,
            config,
            cursor: Cursor::unset(),
        }
    }

    /// Current cursor value, for log context
    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Run a single poll cycle.
    ///
    /// A `FetchError` aborts the cycle with the cursor untouched. Per-post
    /// translation or delivery failures are logged and skipped; they never
    /// abort the cycle nor prevent the cursor update.
    pub async fn poll_once(&mut self) -> Result<RelayReport, FetchError> {
        let since_id = self.cursor.last_id.clone();

        let posts = match self.feed.fetch_latest(since_id.as_deref()).await {
            Ok(posts) => posts,
            Err(e) => {
                tracing::warn!(
                    source = self.feed.name(),
                    cursor = ?since_id,
                    error = %e,
                    "Fetch failed, cycle skipped"
                );
                return Err(e);
            }
        };

        if posts.is_empty() {
            tracing::debug!(source = self.feed.name(), "No posts returned");
            return Ok(RelayReport::default());
        }

        let new_posts = filter::select_new(&posts, &self.cursor, self.config.policy, self.clock.now());

        tracing::info!(
            source = self.feed.name(),
            fetched = posts.len(),
            new = new_posts.len(),
            cursor = ?since_id,
            "Poll cycle"
        );

        let mut report = RelayReport::default();

        for post in &new_posts {
            let translation = match self.translator.translate(&post.text).await {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!(post_id = %post.id, error = %e, "Translation failed, post skipped");
                    report.failed += 1;
                    continue;
                }
            };

            let message = self.renderer.render(post, &translation);

            if self.config.dry_run {
                tracing::info!(post_id = %post.id, message = %message, "[DRY RUN] Would deliver");
                report.delivered += 1;
                continue;
            }

            match self.sink.send(&message).await {
                Ok(()) => {
                    tracing::info!(post_id = %post.id, "Delivered");
                    report.delivered += 1;
                }
                Err(e) => {
                    tracing::warn!(post_id = %post.id, error = %e, "Delivery failed, post skipped");
                    report.failed += 1;
                }
            }
        }

        // Single cursor write per cycle, even when nothing qualified as new
        self.cursor = filter::advance(&self.cursor, &posts);

        Ok(report)
    }
}
