//! Run command - poll the feed and relay new posts forever

use anyhow::{Context, Result, bail};
use feed_relay_adapters::{
    discord::{ChatWatcher, DiscordClient, DiscordSink},
    feed::{DEFAULT_USER_AGENT, RssFeedSource, TimelineFeedSource},
    translate::{GoogleTranslator, LinkTranslator},
};
use feed_relay_domain::{
    FeedSource, MessageSink, SystemClock, Translator,
    usecases::{NewPostPolicy, RelayConfig, RelayLoop, RenderConfig, command},
};
use secrecy::SecretString;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::args::RunArgs;
use crate::config::{AppConfig, load_secret};
use crate::health;

pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    tracing::info!(
        dry_run = args.dry_run,
        once = args.once,
        feed = %config.feed.source,
        translate = %config.translate.mode,
        "Starting feed-relay run"
    );

    // Health responder comes up first, independent of everything else
    let health_port = config.health_port();
    let health = tokio::spawn(health::serve(health_port));

    // Required startup values; absence aborts before any polling begins
    let token = load_secret(&config.discord.token_env, "discord bot")?;
    let channel_id = config.resolve_channel_id()?;

    let feed = build_feed_source(&config)?;
    let translator = build_translator(&config)?;
    let policy = parse_policy(&config)?;

    let chat = DiscordClient::new(token);

    // Wait for the chat client to report a live connection
    let me = chat.wait_ready().await;
    tracing::info!(bot = %me.username, "Chat client ready");

    // Resolve the destination channel once; failure is fatal to the relay
    // loop but the health endpoint stays up for the platform probe
    let sink: Arc<dyn MessageSink> = match DiscordSink::resolve(chat.clone(), channel_id).await {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            tracing::error!(channel_id, error = %e, "Channel resolution failed, relay will not start");
            if args.once {
                bail!("Channel resolution failed: {}", e);
            }
            return health.await.context("health task panicked")?;
        }
    };

    // Command dispatch: watcher task feeds an event channel, the dispatch
    // task answers the keyword command through the shared client handle
    if config.discord.command_enabled && !args.once {
        let (tx, mut rx) = mpsc::channel(64);
        let watcher = ChatWatcher::new(
            chat.clone(),
            channel_id,
            Duration::from_secs(config.discord.command_poll_secs),
        );
        tokio::spawn(watcher.run(tx));

        let responder = chat.clone();
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                if let Some(reply) = command::reply_to(&message.content, message.author_is_bot) {
                    if let Err(e) = responder.create_message(channel_id, reply).await {
                        tracing::warn!(error = %e, "Failed to send command reply");
                    }
                }
            }
        });
    }

    let relay_config = RelayConfig {
        policy,
        dry_run: args.dry_run,
        render_config: RenderConfig {
            author_label: config.general.author_label.clone(),
        },
    };

    let mut relay = RelayLoop::new(feed, translator, sink, Arc::new(SystemClock), relay_config);

    if args.once {
        tracing::info!("Running single poll cycle");
        let report = relay
            .poll_once()
            .await
            .context("Poll cycle failed")?;
        tracing::info!(
            delivered = report.delivered,
            failed = report.failed,
            "Poll cycle complete"
        );
        return Ok(());
    }

    // Continuous polling; the delay runs from the end of one cycle to the
    // start of the next, not on a wall-clock aligned ticker
    let delay = Duration::from_secs(config.watch.poll_interval_secs);

    let shutdown = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        tracing::info!("Shutdown signal received");
    };

    tokio::pin!(shutdown);

    loop {
        match relay.poll_once().await {
            Ok(report) if report.delivered > 0 || report.failed > 0 => {
                tracing::info!(
                    delivered = report.delivered,
                    failed = report.failed,
                    "Poll cycle complete"
                );
            }
            Ok(_) => {}
            Err(_) => {
                // Already logged with source and cursor context; the cursor
                // is untouched and the next tick retries
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = &mut shutdown => {
                tracing::info!("Shutting down gracefully");
                break;
            }
        }
    }

    tracing::info!("feed-relay run completed");
    Ok(())
}

fn build_feed_source(config: &AppConfig) -> Result<Arc<dyn FeedSource>> {
    match config.feed.source.trim() {
        "rss" => {
            if config.feed.rss.mirrors.is_empty() {
                bail!("RSS feed selected but no mirrors configured");
            }
            let user_agent = config
                .feed
                .rss
                .user_agent
                .as_deref()
                .unwrap_or(DEFAULT_USER_AGENT);
            Ok(Arc::new(RssFeedSource::new(
                config.feed.rss.mirrors.clone(),
                user_agent,
            )))
        }
        "timeline" => {
            let bearer = load_secret(&config.feed.timeline.bearer_token_env, "timeline API")?;
            Ok(Arc::new(TimelineFeedSource::new(
                bearer,
                config.feed.timeline.username.clone(),
                config.feed.timeline.page_size,
            )))
        }
        other => bail!("Invalid feed source: {}", other),
    }
}

fn build_translator(config: &AppConfig) -> Result<Arc<dyn Translator>> {
    match config.translate.mode.trim() {
        "google" => {
            let api_key: Option<SecretString> = if config.translate.api_key_env.is_empty() {
                None
            } else {
                Some(load_secret(&config.translate.api_key_env, "translation")?)
            };
            Ok(Arc::new(GoogleTranslator::new(
                config.translate.target_lang.clone(),
                api_key,
            )))
        }
        "links" => Ok(Arc::new(LinkTranslator::new(
            config.translate.target_lang.clone(),
        ))),
        other => bail!("Invalid translate mode: {}", other),
    }
}

fn parse_policy(config: &AppConfig) -> Result<NewPostPolicy> {
    match config.watch.policy.trim() {
        "cursor" => Ok(NewPostPolicy::Cursor),
        "window" => Ok(NewPostPolicy::RecencyWindow(time::Duration::minutes(
            config.watch.window_minutes as i64,
        ))),
        other => bail!("Invalid new-post policy: {}", other),
    }
}
