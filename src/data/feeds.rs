//! RSS feed client
//!
//! Feeds are always fetched live; headlines are never served from the cache.

use chrono::{DateTime, Utc};
use reqwest::Client;
use rss::Channel;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{http_client, FetchError, NewsItem};

/// A named group of feeds shown together on the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedCategory {
    pub name: String,
    pub urls: Vec<String>,
}

impl FeedCategory {
    pub fn new(name: &str, urls: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            urls: urls.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Default feed list, grouped by dashboard section
pub fn default_feeds() -> Vec<FeedCategory> {
    vec![
        FeedCategory::new(
            "Gündem",
            &[
                "https://www.cnnturk.com/feed/rss/turkiye/news",
                "https://www.ntv.com.tr/turkiye.rss",
                "http://www.hurriyet.com.tr/rss/gundem",
            ],
        ),
        FeedCategory::new(
            "Yabancı Kaynak",
            &[
                "https://feeds.bbci.co.uk/news/world/rss.xml",
                "https://rss.nytimes.com/services/xml/rss/nyt/World.xml",
                "https://www.theguardian.com/world/rss",
            ],
        ),
        FeedCategory::new(
            "Dünya",
            &[
                "https://www.cnnturk.com/feed/rss/dunya/news",
                "https://www.ntv.com.tr/dunya.rss",
                "http://feeds.bbci.co.uk/turkce/rss.xml",
                "https://tr.sputniknews.com/export/rss2/archive/index.xml",
            ],
        ),
        FeedCategory::new("Ekonomi", &["https://www.cnnturk.com/feed/rss/ekonomi/news"]),
        FeedCategory::new(
            "Magazin",
            &[
                "https://www.cnnturk.com/feed/rss/magazin/news",
                "https://www.magazinsortie.com/rss/tum-mansetler",
            ],
        ),
        FeedCategory::new(
            "Spor",
            &[
                "https://www.cnnturk.com/feed/rss/spor/news",
                "https://www.ntv.com.tr/spor.rss",
            ],
        ),
        FeedCategory::new("Sanat", &["https://www.sanattanyansimalar.com/rss.xml"]),
    ]
}

/// RSS feed client
#[derive(Debug, Clone)]
pub struct RssClient {
    client: Client,
}

impl Default for RssClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RssClient {
    pub fn new() -> Self {
        Self {
            client: http_client(),
        }
    }

    /// Fetch and parse a single feed
    pub async fn fetch_feed(&self, url: &str) -> Result<Vec<NewsItem>, FetchError> {
        debug!(url, "reading feed");
        let content = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        parse_feed(&content[..], Utc::now())
    }
}

/// Parse an RSS document; items without a title or link are dropped
///
/// `now` stands in for items that carry no parseable publication date.
fn parse_feed(content: &[u8], now: DateTime<Utc>) -> Result<Vec<NewsItem>, FetchError> {
    let channel = Channel::read_from(content)?;
    let source = channel.title().trim().to_string();

    Ok(channel
        .items()
        .iter()
        .filter_map(|item| {
            let title = item.title()?.trim().to_string();
            let link = item.link()?.trim().to_string();
            let pub_date = item.pub_date().map(str::to_string);
            let published_at = pub_date.as_deref().and_then(parse_date).unwrap_or(now);

            Some(NewsItem {
                source: source.clone(),
                title,
                link,
                summary: strip_html(item.description().unwrap_or_default()),
                pub_date,
                published_at,
            })
        })
        .collect())
}

/// Parse RFC 2822 dates, accepting RFC 3339 as used by some feeds
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw.trim())
        .or_else(|_| DateTime::parse_from_rfc3339(raw.trim()))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Strip HTML tags and common entities, collapsing whitespace
fn strip_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;

    for c in html.chars() {
        match c {
            '<' => {
                in_tag = true;
                text.push(' ');
            }
            '>' => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
