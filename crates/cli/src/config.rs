//! Configuration loading and management

use anyhow::{Context, Result, bail};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub translate: TranslateConfig,

    #[serde(default)]
    pub discord: DiscordConfig,

    #[serde(default)]
    pub health: HealthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Author name shown in the message header
    #[serde(default = "default_author_label")]
    pub author_label: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Delay between cycles, measured from the end of one to the start of
    /// the next
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// New-post selection: "cursor" or "window"
    #[serde(default = "default_policy")]
    pub policy: String,

    /// Recency window for the "window" policy
    #[serde(default = "default_window_minutes")]
    pub window_minutes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Which feed variant to poll: "rss" or "timeline"
    #[serde(default = "default_feed_source")]
    pub source: String,

    #[serde(default)]
    pub rss: RssConfig,

    #[serde(default)]
    pub timeline: TimelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RssConfig {
    /// Mirror endpoints tried in order until one answers HTTP 200
    #[serde(default = "default_mirrors")]
    pub mirrors: Vec<String>,

    /// Client identifier header; mirrors block default client UAs
    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineConfig {
    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default = "default_bearer_token_env")]
    pub bearer_token_env: String,

    #[serde(default = "default_page_size")]
    pub page_size: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    /// "google" for inline translation, "links" for translator links
    #[serde(default = "default_translate_mode")]
    pub mode: String,

    #[serde(default = "default_target_lang")]
    pub target_lang: String,

    /// Optional translation-service credential; empty means keyless
    #[serde(default)]
    pub api_key_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Environment variable holding the numeric channel id; the inline
    /// `channel_id` value is used when the variable is unset
    #[serde(default = "default_channel_id_env")]
    pub channel_id_env: String,

    #[serde(default)]
    pub channel_id: u64,

    /// Answer the !ping keyword command
    #[serde(default = "default_true")]
    pub command_enabled: bool,

    /// How often the channel is polled for inbound messages
    #[serde(default = "default_command_poll_secs")]
    pub command_poll_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Liveness port; the PORT environment variable takes precedence
    #[serde(default = "default_health_port")]
    pub port: u16,
}

// Default value functions
fn default_author_label() -> String {
    "Elon Musk".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_poll_interval() -> u64 {
    60
}

fn default_policy() -> String {
    "cursor".to_string()
}

fn default_window_minutes() -> u64 {
    30
}

fn default_feed_source() -> String {
    "rss".to_string()
}

fn default_mirrors() -> Vec<String> {
    vec![
        "https://nitter.net/elonmusk/rss".to_string(),
        "https://nitter.poast.org/elonmusk/rss".to_string(),
        "https://nitter.privacydev.net/elonmusk/rss".to_string(),
    ]
}

fn default_username() -> String {
    "elonmusk".to_string()
}

fn default_bearer_token_env() -> String {
    "X_BEARER_TOKEN".to_string()
}

fn default_page_size() -> u8 {
    10
}

fn default_translate_mode() -> String {
    "google".to_string()
}

fn default_target_lang() -> String {
    "ko".to_string()
}

fn default_token_env() -> String {
    "DISCORD_TOKEN".to_string()
}

fn default_channel_id_env() -> String {
    "DISCORD_CHANNEL_ID".to_string()
}

fn default_true() -> bool {
    true
}

fn default_command_poll_secs() -> u64 {
    5
}

fn default_health_port() -> u16 {
    5000
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            author_label: default_author_label(),
            log_level: default_log_level(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            policy: default_policy(),
            window_minutes: default_window_minutes(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            source: default_feed_source(),
            rss: RssConfig::default(),
            timeline: TimelineConfig::default(),
        }
    }
}

impl Default for RssConfig {
    fn default() -> Self {
        Self {
            mirrors: default_mirrors(),
            user_agent: None,
        }
    }
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            username: default_username(),
            bearer_token_env: default_bearer_token_env(),
            page_size: default_page_size(),
        }
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            mode: default_translate_mode(),
            target_lang: default_target_lang(),
            api_key_env: String::new(),
        }
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
            channel_id_env: default_channel_id_env(),
            channel_id: 0,
            command_enabled: default_true(),
            command_poll_secs: default_command_poll_secs(),
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            port: default_health_port(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            // User specified a path that doesn't exist
            bail!("Config file not found: {}", path.display());
        }

        // Add environment variable overrides
        builder = builder.add_source(
            config::Environment::with_prefix("FEED_RELAY")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Destination channel id: environment variable first, then the config
    /// file. Absence is a fatal startup error.
    pub fn resolve_channel_id(&self) -> Result<u64> {
        if let Ok(raw) = std::env::var(&self.discord.channel_id_env) {
            return raw.trim().parse::<u64>().with_context(|| {
                format!("{} is not a numeric channel id", self.discord.channel_id_env)
            });
        }
        if self.discord.channel_id != 0 {
            return Ok(self.discord.channel_id);
        }
        bail!(
            "No target channel configured: set {} or [discord].channel_id",
            self.discord.channel_id_env
        );
    }

    /// Health port: PORT environment variable first (hosting platforms
    /// inject it), then the config file.
    pub fn health_port(&self) -> u16 {
        std::env::var("PORT")
            .ok()
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(self.health.port)
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r#"# feed-relay configuration

[general]
author_label = "Elon Musk"
log_level = "info"

[watch]
poll_interval_secs = 60
policy = "cursor"  # cursor, window
window_minutes = 30

[feed]
source = "rss"  # rss, timeline

[feed.rss]
mirrors = [
    "https://nitter.net/elonmusk/rss",
    "https://nitter.poast.org/elonmusk/rss",
    "https://nitter.privacydev.net/elonmusk/rss",
]
# user_agent = "Mozilla/5.0 ..."

[feed.timeline]
username = "elonmusk"
bearer_token_env = "X_BEARER_TOKEN"
page_size = 10

[translate]
mode = "google"  # google, links
target_lang = "ko"
# api_key_env = "TRANSLATE_API_KEY"

[discord]
token_env = "DISCORD_TOKEN"
channel_id_env = "DISCORD_CHANNEL_ID"
# channel_id = 123456789012345678
command_enabled = true
command_poll_secs = 5

[health]
port = 5000
"#
        .to_string()
    }
}

/// Read a required secret from the environment variable named in the config
pub fn load_secret(env_name: &str, purpose: &str) -> Result<SecretString> {
    let value = std::env::var(env_name)
        .with_context(|| format!("Missing {} credential: set {}", purpose, env_name))?;
    if value.trim().is_empty() {
        bail!("{} is set but empty ({} credential)", env_name, purpose);
    }
    Ok(SecretString::new(value.into()))
}
