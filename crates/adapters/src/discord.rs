//! Discord REST adapters: delivery sink and inbound message watcher
//!
//! Everything goes over the plain REST API with a bot token; inbound
//! messages are observed by polling the channel rather than holding a
//! gateway connection.

use async_trait::async_trait;
use feed_relay_domain::{DeliveryError, MessageSink};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const DEFAULT_BASE_URL: &str = "https://discord.com/api/v10";

/// An inbound chat message, forwarded over an event channel to the
/// command dispatch task.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: String,
    pub content: String,
    pub author_is_bot: bool,
}

/// The bot's own identity, reported once the API answers `/users/@me`
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
}

/// Thin Discord REST client shared by the sink and the watcher
#[derive(Debug, Clone)]
pub struct DiscordClient {
    client: Client,
    token: Arc<SecretString>,
    base_url: String,
}

impl DiscordClient {
    pub fn new(token: SecretString) -> Self {
        Self::with_base_url(token, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(token: SecretString, base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            token: Arc::new(token),
            base_url,
        }
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.token.expose_secret())
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, DeliveryError> {
        let status = response.status();
        if status == 401 || status == 403 {
            return Err(DeliveryError::Auth(format!("HTTP {}", status.as_u16())));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Api(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }
        Ok(response)
    }

    /// Identify the bot account; success means the token works and the API
    /// is reachable.
    pub async fn current_user(&self) -> Result<CurrentUser, DeliveryError> {
        let url = format!("{}/users/@me", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| DeliveryError::Network(e.to_string()))?;

        Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| DeliveryError::Api(e.to_string()))
    }

    /// Block until the API answers the identity call. There is no deadline;
    /// startup waits as long as it takes.
    pub async fn wait_ready(&self) -> CurrentUser {
        loop {
            match self.current_user().await {
                Ok(user) => return user,
                Err(e) => {
                    tracing::warn!(error = %e, "Chat client not ready yet, retrying");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }

    pub async fn get_channel(&self, channel_id: u64) -> Result<(), DeliveryError> {
        let url = format!("{}/channels/{}", self.base_url, channel_id);
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| DeliveryError::Network(e.to_string()))?;

        Self::check(response).await?;
        Ok(())
    }

    pub async fn create_message(
        &self,
        channel_id: u64,
        content: &str,
    ) -> Result<(), DeliveryError> {
        let url = format!("{}/channels/{}/messages", self.base_url, channel_id);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await
            .map_err(|e| DeliveryError::Network(e.to_string()))?;

        Self::check(response).await?;
        Ok(())
    }

    /// Id of the newest message in the channel, used to seed the watcher so
    /// it never replies to history.
    pub async fn latest_message_id(
        &self,
        channel_id: u64,
    ) -> Result<Option<String>, DeliveryError> {
        let url = format!("{}/channels/{}/messages?limit=1", self.base_url, channel_id);
        let messages = self.fetch_messages(&url).await?;
        Ok(messages.into_iter().next().map(|m| m.id))
    }

    /// Messages posted after the given id, oldest first
    pub async fn messages_after(
        &self,
        channel_id: u64,
        after: &str,
    ) -> Result<Vec<InboundMessage>, DeliveryError> {
        let url = format!(
            "{}/channels/{}/messages?after={}&limit=50",
            self.base_url, channel_id, after
        );
        let mut messages = self.fetch_messages(&url).await?;
        // The API returns newest first; snowflake ids sort chronologically
        messages.sort_by_key(|m| m.id.parse::<u64>().unwrap_or(0));
        Ok(messages)
    }

    async fn fetch_messages(&self, url: &str) -> Result<Vec<InboundMessage>, DeliveryError> {
        let response = self
            .client
            .get(url)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| DeliveryError::Network(e.to_string()))?;

        let messages: Vec<ApiMessage> = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| DeliveryError::Api(e.to_string()))?;

        Ok(messages
            .into_iter()
            .map(|m| InboundMessage {
                id: m.id,
                content: m.content,
                author_is_bot: m.author.map(|a| a.bot).unwrap_or(false),
            })
            .collect())
    }
}

#[derive(Deserialize)]
struct ApiMessage {
    id: String,
    #[serde(default)]
    content: String,
    author: Option<ApiAuthor>,
}

#[derive(Deserialize)]
struct ApiAuthor {
    #[serde(default)]
    bot: bool,
}

/// Delivery sink for the single fixed destination channel
#[derive(Debug)]
pub struct DiscordSink {
    client: DiscordClient,
    channel_id: u64,
}

impl DiscordSink {
    /// Resolve the destination channel once at startup. An unknown or
    /// inaccessible channel id is fatal to the relay loop.
    pub async fn resolve(client: DiscordClient, channel_id: u64) -> Result<Self, DeliveryError> {
        client.get_channel(channel_id).await.map_err(|e| {
            DeliveryError::ChannelResolution {
                id: channel_id,
                message: e.to_string(),
            }
        })?;

        Ok(Self { client, channel_id })
    }
}

#[async_trait]
impl MessageSink for DiscordSink {
    async fn send(&self, text: &str) -> Result<(), DeliveryError> {
        self.client.create_message(self.channel_id, text).await
    }
}

/// Polls the channel for inbound messages and forwards them as events.
///
/// Runs as its own task; communicates with the dispatch task only through
/// the mpsc channel, never through shared state.
pub struct ChatWatcher {
    client: DiscordClient,
    channel_id: u64,
    poll_interval: Duration,
}

impl ChatWatcher {
    pub fn new(client: DiscordClient, channel_id: u64, poll_interval: Duration) -> Self {
        Self {
            client,
            channel_id,
            poll_interval,
        }
    }

    pub async fn run(self, events: mpsc::Sender<InboundMessage>) {
        // Seed the marker with the newest existing message so only messages
        // arriving from now on are observed.
        let mut marker = loop {
            match self.client.latest_message_id(self.channel_id).await {
                Ok(id) => break id.unwrap_or_else(|| "0".to_string()),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to seed message marker, retrying");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        };

        loop {
            tokio::time::sleep(self.poll_interval).await;

            let messages = match self.client.messages_after(self.channel_id, &marker).await {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to poll channel messages");
                    continue;
                }
            };

            for message in messages {
                marker = message.id.clone();
                if events.send(message).await.is_err() {
                    // Dispatch side is gone; nothing left to do
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> DiscordClient {
        DiscordClient::with_base_url(SecretString::new("bot-token".into()), server.uri())
    }

    #[tokio::test]
    async fn create_message_posts_content_with_bot_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/channels/42/messages"))
            .and(header("Authorization", "Bot bot-token"))
            .and(body_json(serde_json::json!({ "content": "hello" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "1", "content": "hello"
            })))
            .mount(&server)
            .await;

        client(&server).create_message(42, "hello").await.unwrap();
    }

    #[tokio::test]
    async fn sink_resolution_fails_on_unknown_channel() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels/42"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "message": "Unknown Channel", "code": 10003
            })))
            .mount(&server)
            .await;

        let err = DiscordSink::resolve(client(&server), 42).await.unwrap_err();
        assert!(matches!(
            err,
            DeliveryError::ChannelResolution { id: 42, .. }
        ));
    }

    #[tokio::test]
    async fn sink_sends_to_the_resolved_channel() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "42", "type": 0
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/channels/42/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let sink = DiscordSink::resolve(client(&server), 42).await.unwrap();
        sink.send("🏓 Pong!").await.unwrap();
    }

    #[tokio::test]
    async fn messages_after_are_sorted_oldest_first_with_bot_flag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels/42/messages"))
            .and(query_param("after", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": "12", "content": "!ping", "author": { "id": "u1", "bot": false } },
                { "id": "11", "content": "🚀 relay", "author": { "id": "u2", "bot": true } }
            ])))
            .mount(&server)
            .await;

        let messages = client(&server).messages_after(42, "10").await.unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, "11");
        assert!(messages[0].author_is_bot);
        assert_eq!(messages[1].id, "12");
        assert!(!messages[1].author_is_bot);
    }

    #[tokio::test]
    async fn invalid_token_is_an_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/@me"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client(&server).current_user().await.unwrap_err();
        assert!(matches!(err, DeliveryError::Auth(_)));
    }

    #[tokio::test]
    async fn latest_message_id_reads_the_newest_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels/42/messages"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": "99", "content": "latest", "author": { "id": "u1" } }
            ])))
            .mount(&server)
            .await;

        let id = client(&server).latest_message_id(42).await.unwrap();
        assert_eq!(id.as_deref(), Some("99"));
    }
}
