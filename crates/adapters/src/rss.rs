//! Syndication feed source with ordered mirror fallback

use async_trait::async_trait;
use feed_relay_domain::{FeedSource, FetchError, Post};
use quick_xml::de::from_str;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use time::format_description::well_known::Rfc2822;
use time::{OffsetDateTime, UtcOffset};

/// Browser-like identifier; mirror instances block default client UAs.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// RSS feed source reading the watched author's feed through one or more
/// mirror endpoints, tried in order until one answers HTTP 200.
pub struct RssFeedSource {
    client: Client,
    mirrors: Vec<String>,
}

impl RssFeedSource {
    pub fn new(mirrors: Vec<String>, user_agent: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()
            .expect("Failed to build HTTP client");

        Self { client, mirrors }
    }

    fn parse_feed(body: &str) -> Result<Vec<Post>, FetchError> {
        let rss: Rss = from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;

        let posts = rss
            .channel
            .item
            .into_iter()
            .filter_map(|item| {
                let permalink = item.link?;
                // Mirrors put the permalink in <guid> as well; fall back to
                // the link itself when the guid is absent.
                let id = item.guid.unwrap_or_else(|| permalink.clone());
                Some(Post {
                    id,
                    text: item.title.unwrap_or_default(),
                    published_at: item
                        .pub_date
                        .as_deref()
                        .map(parse_rfc2822_utc)
                        .unwrap_or(OffsetDateTime::UNIX_EPOCH),
                    permalink,
                })
            })
            .collect();

        Ok(posts)
    }
}

fn parse_rfc2822_utc(ts: &str) -> OffsetDateTime {
    OffsetDateTime::parse(ts, &Rfc2822)
        .map(|dt| dt.to_offset(UtcOffset::UTC))
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

#[async_trait]
impl FeedSource for RssFeedSource {
    /// Feed document order is newest first and is preserved. `since_id` is
    /// ignored; syndication feeds cannot be queried incrementally, dedup is
    /// the cursor filter's job.
    async fn fetch_latest(&self, _since_id: Option<&str>) -> Result<Vec<Post>, FetchError> {
        for mirror in &self.mirrors {
            let response = match self.client.get(mirror).send().await {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(mirror = %mirror, error = %e, "Mirror unreachable, trying next");
                    continue;
                }
            };

            if !response.status().is_success() {
                tracing::warn!(
                    mirror = %mirror,
                    status = response.status().as_u16(),
                    "Mirror returned non-success, trying next"
                );
                continue;
            }

            let body = response
                .text()
                .await
                .map_err(|e| FetchError::Network(e.to_string()))?;

            return Self::parse_feed(&body);
        }

        Err(FetchError::Exhausted(self.mirrors.len()))
    }

    fn name(&self) -> &'static str {
        "rss"
    }
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: RssChannel,
}

#[derive(Debug, Deserialize)]
struct RssChannel {
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    guid: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>author / @author</title>
    <item>
      <title>Second post</title>
      <guid>https://mirror.example/author/status/2</guid>
      <link>https://mirror.example/author/status/2</link>
      <pubDate>Mon, 15 Jan 2024 13:00:00 +0000</pubDate>
    </item>
    <item>
      <title>First post</title>
      <guid>https://mirror.example/author/status/1</guid>
      <link>https://mirror.example/author/status/1</link>
      <pubDate>Mon, 15 Jan 2024 12:00:00 +0000</pubDate>
    </item>
  </channel>
</rss>"#;

    fn feed_route(server: &MockServer) -> String {
        format!("{}/author/rss", server.uri())
    }

    #[tokio::test]
    async fn parses_feed_newest_first() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/author/rss"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED_XML))
            .mount(&server)
            .await;

        let source = RssFeedSource::new(vec![feed_route(&server)], DEFAULT_USER_AGENT);
        let posts = source.fetch_latest(None).await.unwrap();

        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, "https://mirror.example/author/status/2");
        assert_eq!(posts[0].text, "Second post");
        assert_eq!(posts[0].published_at.to_string(), "2024-01-15 13:00:00.0 +00:00:00");
        assert!(posts[0].published_at > posts[1].published_at);
    }

    #[tokio::test]
    async fn falls_back_to_next_mirror_on_non_success() {
        let failing = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/author/rss"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&failing)
            .await;

        let working = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/author/rss"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED_XML))
            .mount(&working)
            .await;

        let source = RssFeedSource::new(
            vec![feed_route(&failing), feed_route(&working)],
            DEFAULT_USER_AGENT,
        );
        let posts = source.fetch_latest(None).await.unwrap();
        assert_eq!(posts.len(), 2);
    }

    #[tokio::test]
    async fn all_mirrors_failing_is_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let source = RssFeedSource::new(
            vec![feed_route(&server), format!("{}/other/rss", server.uri())],
            DEFAULT_USER_AGENT,
        );
        let err = source.fetch_latest(None).await.unwrap_err();
        assert!(matches!(err, FetchError::Exhausted(2)));
    }

    #[tokio::test]
    async fn malformed_body_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/author/rss"))
            .respond_with(ResponseTemplate::new(200).set_body_string("this is not xml"))
            .mount(&server)
            .await;

        let source = RssFeedSource::new(vec![feed_route(&server)], DEFAULT_USER_AGENT);
        let err = source.fetch_latest(None).await.unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }
}
