//! Timeline API feed source (X API v2) for the watched author

use async_trait::async_trait;
use feed_relay_domain::{FeedSource, FetchError, Post};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::OnceCell;

/// Feed source calling the "recent posts since id" timeline endpoint.
///
/// Unlike the RSS variant, the API filters server-side: with a `since_id`
/// only newer posts come back, already newest first.
pub struct TimelineFeedSource {
    client: Client,
    bearer_token: SecretString,
    base_url: String,
    username: String,
    page_size: u8,
    user_id: OnceCell<String>,
}

impl TimelineFeedSource {
    pub fn new(bearer_token: SecretString, username: String, page_size: u8) -> Self {
        Self::with_base_url(
            bearer_token,
            username,
            page_size,
            "https://api.twitter.com".to_string(),
        )
    }

    pub fn with_base_url(
        bearer_token: SecretString,
        username: String,
        page_size: u8,
        base_url: String,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            bearer_token,
            base_url,
            // The API rejects max_results below 5; cap at 10 to keep a
            // catch-up burst from flooding the channel.
            page_size: page_size.clamp(5, 10),
            username,
            user_id: OnceCell::new(),
        }
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let response = self
            .client
            .get(url)
            .header(
                "Authorization",
                format!("Bearer {}", self.bearer_token.expose_secret()),
            )
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if response.status() == 401 {
            return Err(FetchError::Auth("Invalid bearer token".to_string()));
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Api(format!("HTTP {}: {}", status, body)));
        }

        Ok(response)
    }

    /// Look up the watched author's user id; resolved once per process.
    async fn user_id(&self) -> Result<&str, FetchError> {
        self.user_id
            .get_or_try_init(|| async {
                let url = format!("{}/2/users/by/username/{}", self.base_url, self.username);
                let response = self.get(&url).await?;
                let user: UserResponse = response
                    .json()
                    .await
                    .map_err(|e| FetchError::Parse(e.to_string()))?;
                Ok(user.data.id)
            })
            .await
            .map(String::as_str)
    }
}

#[async_trait]
impl FeedSource for TimelineFeedSource {
    async fn fetch_latest(&self, since_id: Option<&str>) -> Result<Vec<Post>, FetchError> {
        let user_id = self.user_id().await?;

        let mut url = format!(
            "{}/2/users/{}/tweets?tweet.fields=created_at&max_results={}",
            self.base_url, user_id, self.page_size
        );
        if let Some(since_id) = since_id {
            url.push_str(&format!("&since_id={}", since_id));
        }

        let response = self.get(&url).await?;
        let timeline: TimelineResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))?;

        // API order is newest first; keep it that way for the filter.
        let posts = timeline
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|item| Post {
                permalink: format!("https://x.com/{}/status/{}", self.username, item.id),
                text: item.text,
                published_at: item
                    .created_at
                    .as_deref()
                    .and_then(|s| OffsetDateTime::parse(s, &Rfc3339).ok())
                    .unwrap_or(OffsetDateTime::UNIX_EPOCH),
                id: item.id,
            })
            .collect();

        Ok(posts)
    }

    fn name(&self) -> &'static str {
        "timeline"
    }
}

#[derive(Deserialize)]
struct UserResponse {
    data: UserData,
}

#[derive(Deserialize)]
struct UserData {
    id: String,
}

#[derive(Deserialize)]
struct TimelineResponse {
    data: Option<Vec<TimelineItem>>,
}

#[derive(Deserialize)]
struct TimelineItem {
    id: String,
    text: String,
    created_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, path_regex, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(server: &MockServer) -> TimelineFeedSource {
        TimelineFeedSource::with_base_url(
            SecretString::new("test-token".into()),
            "author".to_string(),
            10,
            server.uri(),
        )
    }

    async fn mount_user_lookup(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/2/users/by/username/author"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "id": "9001" }
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn fetches_posts_newest_first_with_permalinks() {
        let server = MockServer::start().await;
        mount_user_lookup(&server).await;

        Mock::given(method("GET"))
            .and(path_regex(r"^/2/users/9001/tweets$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    { "id": "2", "text": "newer", "created_at": "2024-01-15T13:00:00Z" },
                    { "id": "1", "text": "older", "created_at": "2024-01-15T12:00:00Z" }
                ]
            })))
            .mount(&server)
            .await;

        let posts = source(&server).fetch_latest(None).await.unwrap();

        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, "2");
        assert_eq!(posts[0].permalink, "https://x.com/author/status/2");
        assert!(posts[0].published_at > posts[1].published_at);
    }

    #[tokio::test]
    async fn passes_since_id_and_page_size() {
        let server = MockServer::start().await;
        mount_user_lookup(&server).await;

        Mock::given(method("GET"))
            .and(path("/2/users/9001/tweets"))
            .and(query_param("since_id", "41"))
            .and(query_param("max_results", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": null
            })))
            .mount(&server)
            .await;

        let posts = source(&server).fetch_latest(Some("41")).await.unwrap();
        assert!(posts.is_empty());
    }

    #[tokio::test]
    async fn invalid_token_is_an_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2/users/by/username/author"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = source(&server).fetch_latest(None).await.unwrap_err();
        assert!(matches!(err, FetchError::Auth(_)));
    }

    #[tokio::test]
    async fn user_lookup_happens_once() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/users/by/username/author"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "id": "9001" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/2/users/9001/tweets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": []
            })))
            .mount(&server)
            .await;

        let source = source(&server);
        source.fetch_latest(None).await.unwrap();
        source.fetch_latest(None).await.unwrap();
    }
}
