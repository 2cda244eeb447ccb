//! RSS feed retrieval and parsing.
//!
//! The feed is fetched with a browser-like User-Agent and a bounded timeout,
//! decoded as UTF-8 whatever charset the server claims, and deserialized from
//! `rss > channel > item*`. Only `title` and `description` are kept.

use crate::config::FeedConfig;
use crate::error::FeedError;
use crate::models::NewsItem;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};

/// Anything that can produce the run's candidate news items.
pub trait FeedSource {
    async fn fetch(&self) -> Result<Vec<NewsItem>, FeedError>;
}

/// An RSS 2.0 feed reached over HTTP.
#[derive(Debug)]
pub struct RssFeed {
    client: Client,
    url: String,
}

impl RssFeed {
    /// Build a feed client from the run configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Feed URL, request timeout and User-Agent
    ///
    /// # Returns
    ///
    /// The client, or an error if the underlying HTTP client cannot be built.
    pub fn new(config: &FeedConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

impl FeedSource for RssFeed {
    #[instrument(level = "info", skip_all, fields(url = %self.url))]
    async fn fetch(&self) -> Result<Vec<NewsItem>, FeedError> {
        info!("Fetching RSS feed");
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        let body = String::from_utf8_lossy(&bytes);
        debug!(bytes = bytes.len(), "Downloaded feed body");

        let items = parse_rss(&body)?;
        info!(count = items.len(), "Fetched news items");
        Ok(items)
    }
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(default, rename = "item")]
    items: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: Option<RawDescription>,
}

/// `<description>` body. Text and CDATA land in `text`; child elements
/// (unescaped HTML such as `<p>`) are unknown fields and skipped.
#[derive(Debug, Deserialize)]
struct RawDescription {
    #[serde(rename = "$text", default)]
    text: Option<String>,
}

impl From<RawItem> for NewsItem {
    fn from(raw: RawItem) -> Self {
        NewsItem {
            title: raw.title.trim().to_string(),
            description: raw.description.and_then(|d| d.text),
        }
    }
}

/// Parse an RSS document into its items, in document order.
///
/// Items without a title are dropped. A description made of raw markup
/// rather than text is treated as absent instead of failing the feed.
pub fn parse_rss(xml: &str) -> Result<Vec<NewsItem>, FeedError> {
    let rss: Rss = quick_xml::de::from_str(xml)?;
    let total = rss.channel.items.len();
    let items: Vec<NewsItem> = rss
        .channel
        .items
        .into_iter()
        .map(NewsItem::from)
        .filter(|item| !item.title.is_empty())
        .collect();

    if items.len() < total {
        debug!(dropped = total - items.len(), "Skipped feed items without a title");
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve_once;
    use std::time::Duration;

    fn feed_config(url: String) -> FeedConfig {
        FeedConfig {
            url,
            timeout: Duration::from_secs(5),
            user_agent: crate::config::DEFAULT_USER_AGENT.to_string(),
        }
    }

    const FEED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<rss version="2.0">
  <channel>
    <title>快科技</title>
    <link>https://news.mydrivers.com/</link>
    <item>
      <title><![CDATA[华为发布新一代AI芯片]]></title>
      <link>https://news.mydrivers.com/1/1.htm</link>
      <description><![CDATA[<p>性能提升 &amp; 功耗下降</p>]]></description>
      <guid isPermaLink="true">https://news.mydrivers.com/1/1.htm</guid>
    </item>
    <item>
      <title>R&amp;D 投入创新高</title>
    </item>
    <item>
      <title>   </title>
      <description>no title here</description>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_rss_items_in_order() {
        let items = parse_rss(FEED).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "华为发布新一代AI芯片");
        assert_eq!(
            items[0].description.as_deref(),
            Some("<p>性能提升 &amp; 功耗下降</p>")
        );
        assert_eq!(items[1].title, "R&D 投入创新高");
        assert_eq!(items[1].description_text(), "");
    }

    #[test]
    fn test_parse_rss_single_item() {
        let xml = r#"<rss><channel><item><title>唯一一条</title></item></channel></rss>"#;
        let items = parse_rss(xml).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "唯一一条");
    }

    #[test]
    fn test_parse_rss_empty_channel() {
        let xml = r#"<rss><channel><title>empty</title></channel></rss>"#;
        assert!(parse_rss(xml).unwrap().is_empty());
    }

    #[test]
    fn test_parse_rss_tolerates_markup_in_description() {
        let xml = r#"<rss><channel>
            <item><title>A</title><description><p>raw html</p></description></item>
            <item><title>AI 芯片</title><description>纯文本</description></item>
        </channel></rss>"#;
        let items = parse_rss(xml).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "A");
        assert_eq!(items[0].description, None);
        assert_eq!(items[1].title, "AI 芯片");
        assert_eq!(items[1].description.as_deref(), Some("纯文本"));
    }

    #[test]
    fn test_parse_rss_rejects_garbage() {
        assert!(matches!(
            parse_rss("<html><body>502 Bad Gateway</body></html>"),
            Err(FeedError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_sends_browser_user_agent() {
        let (base, server) = serve_once(
            200,
            "<rss><channel><item><title>AI 新闻</title></item></channel></rss>",
        )
        .await;
        let feed = RssFeed::new(&feed_config(format!("{base}/Rss.aspx?Tid=1"))).unwrap();

        let items = feed.fetch().await.unwrap();
        let request = server.await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "AI 新闻");
        assert!(request.request_line.starts_with("GET /Rss.aspx?Tid=1 "));
        assert_eq!(
            request.header("user-agent"),
            Some(crate::config::DEFAULT_USER_AGENT)
        );
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let (base, server) = serve_once(404, "not found").await;
        let feed = RssFeed::new(&feed_config(base)).unwrap();

        let err = feed.fetch().await.unwrap_err();
        server.await.unwrap();
        assert!(matches!(err, FeedError::Status(404)));
    }
}
