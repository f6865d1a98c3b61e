//! Dashboard aggregation
//!
//! Gathers every source concurrently. Slow or rate-limited APIs go through the
//! `CacheStore`; RSS headlines are always fetched live. A failing source never aborts
//! the run: it is logged and shows up as an empty section.

use std::future::Future;
use std::time::Duration;

use chrono::Local;
use futures::stream::{self, StreamExt};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{info, warn};

use crate::cache::CacheStore;
use crate::config::{CacheTtls, DashboardConfig};
use crate::data::{
    Event, ExchangeRateClient, ExchangeRates, FeedCategory, FetchError, HourlyForecast, Movie,
    MoviesClient, NewsItem, RssClient, SpotifyClient, TicketmasterClient, Track, WeatherClient,
};

/// Cache keys, one record per source
pub const WEATHER_KEY: &str = "weather.json";
pub const EXCHANGE_RATES_KEY: &str = "exchange_rates.json";
pub const MOVIES_KEY: &str = "movies.json";
pub const TRACKS_KEY: &str = "spotify_tracks.json";
pub const EVENTS_KEY: &str = "events.json";

/// Number of headlines in `DashboardData::latest_news`
const LATEST_NEWS_LIMIT: usize = 20;

/// Headlines of one feed category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsSection {
    pub category: String,
    pub items: Vec<NewsItem>,
}

/// Everything shown on the dashboard page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardData {
    pub weather: Vec<HourlyForecast>,
    /// `None` when the rates could not be fetched
    pub exchange_rates: Option<ExchangeRates>,
    pub movies: Vec<Movie>,
    pub tracks: Vec<Track>,
    pub events: Vec<Event>,
    /// One section per configured category, in configuration order
    pub news: Vec<NewsSection>,
    /// Newest headlines across all categories
    pub latest_news: Vec<NewsItem>,
    /// Local time the data was gathered
    pub last_update: String,
}

/// Owns the cache and one client per source
#[derive(Debug, Clone)]
pub struct Dashboard {
    cache: CacheStore,
    ttls: CacheTtls,
    weather: WeatherClient,
    exchange: ExchangeRateClient,
    movies: MoviesClient,
    spotify: SpotifyClient,
    events: TicketmasterClient,
    rss: RssClient,
    feeds: Vec<FeedCategory>,
    max_concurrent_feeds: usize,
}

impl Dashboard {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            cache: CacheStore::with_dir(config.cache_dir),
            ttls: config.ttls,
            weather: WeatherClient::new(config.weather),
            exchange: ExchangeRateClient::new(),
            movies: MoviesClient::new(config.tmdb_api_key),
            spotify: SpotifyClient::new(config.spotify),
            events: TicketmasterClient::new(config.ticketmaster_api_key),
            rss: RssClient::new(),
            feeds: config.feeds,
            max_concurrent_feeds: config.max_concurrent_feeds.max(1),
        }
    }

    /// Replaces the cache store, e.g. to use a different clock
    pub fn with_cache(mut self, cache: CacheStore) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Fetch every source and assemble the page data
    pub async fn gather(&self) -> DashboardData {
        info!("gathering dashboard data");

        let (weather, exchange_rates, movies, tracks, events, news) = tokio::join!(
            self.cached(WEATHER_KEY, self.ttls.weather, || self.weather.fetch_forecast()),
            self.cached(EXCHANGE_RATES_KEY, self.ttls.exchange_rates, || {
                self.exchange.fetch_rates()
            }),
            self.cached(MOVIES_KEY, self.ttls.movies, || self.movies.fetch_now_playing()),
            self.cached(TRACKS_KEY, self.ttls.tracks, || self.spotify.fetch_tracks()),
            self.cached(EVENTS_KEY, self.ttls.events, || self.events.fetch_events()),
            self.gather_news(),
        );

        let latest_news = latest_news(&news, LATEST_NEWS_LIMIT);
        info!(
            sections = news.len(),
            headlines = latest_news.len(),
            "dashboard data gathered"
        );

        DashboardData {
            weather: weather.unwrap_or_default(),
            exchange_rates,
            movies: movies.unwrap_or_default(),
            tracks: tracks.unwrap_or_default(),
            events: events.unwrap_or_default(),
            news,
            latest_news,
            last_update: Local::now().format("%d %B %Y, %H:%M:%S").to_string(),
        }
    }

    /// Fetch every configured feed, at most `max_concurrent_feeds` at a time
    ///
    /// Feeds that fail are logged and left out; sections keep configuration order.
    pub async fn gather_news(&self) -> Vec<NewsSection> {
        let jobs = self
            .feeds
            .iter()
            .enumerate()
            .flat_map(|(index, category)| category.urls.iter().map(move |url| (index, url)));

        let results: Vec<_> = stream::iter(jobs)
            .map(|(index, url)| async move { (index, url, self.rss.fetch_feed(url).await) })
            .buffered(self.max_concurrent_feeds)
            .collect()
            .await;

        let mut sections: Vec<NewsSection> = self
            .feeds
            .iter()
            .map(|category| NewsSection {
                category: category.name.clone(),
                items: Vec::new(),
            })
            .collect();

        for (index, url, result) in results {
            match result {
                Ok(items) => sections[index].items.extend(items),
                Err(err) => warn!(url = %url, error = %err, "feed unavailable"),
            }
        }

        sections
    }

    /// Serve `key` through the cache, or `None` if the source failed
    async fn cached<T, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Option<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        match self.cache.get_async(key, fetch, ttl).await {
            Ok(data) => Some(data),
            Err(err) => {
                warn!(key, error = %err, "source unavailable, showing empty section");
                None
            }
        }
    }
}

/// The newest `limit` headlines across all sections, newest first
pub fn latest_news(sections: &[NewsSection], limit: usize) -> Vec<NewsItem> {
    let mut all: Vec<NewsItem> = sections
        .iter()
        .flat_map(|section| section.items.iter().cloned())
        .collect();
    all.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    all.truncate(limit);
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn news_item(title: &str, hour: u32) -> NewsItem {
        NewsItem {
            source: "Test".to_string(),
            title: title.to_string(),
            link: format!("https://example.com/{}", title),
            summary: String::new(),
            pub_date: None,
            published_at: Utc.with_ymd_and_hms(2024, 5, 20, hour, 0, 0).unwrap(),
        }
    }

    /// A dashboard with no feeds whose exchange-rate endpoint refuses connections
    fn offline_dashboard() -> (Dashboard, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut config = DashboardConfig::new(temp_dir.path());
        config.feeds = Vec::new();
        let mut dashboard = Dashboard::new(config);
        dashboard.exchange = ExchangeRateClient::new().with_url("http://127.0.0.1:9/latest/USD");
        (dashboard, temp_dir)
    }

    #[test]
    fn test_latest_news_orders_newest_first_and_truncates() {
        let sections = vec![
            NewsSection {
                category: "Gündem".to_string(),
                items: vec![news_item("a", 8), news_item("b", 11)],
            },
            NewsSection {
                category: "Spor".to_string(),
                items: vec![news_item("c", 9)],
            },
        ];

        let latest = latest_news(&sections, 2);

        let titles: Vec<_> = latest.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_gather_serves_cached_sources_without_network() {
        let (dashboard, _temp_dir) = offline_dashboard();
        let cache = dashboard.cache();
        let rates = ExchangeRates {
            usd_try: 32.1,
            eur_try: Some(34.9),
            gbp_try: None,
        };
        let tracks = vec![Track {
            artist: "Sanatçı".to_string(),
            title: "Parça".to_string(),
            embed_url: "https://open.spotify.com/embed/track/x".to_string(),
        }];
        cache.store(EXCHANGE_RATES_KEY, &rates).unwrap();
        cache.store(TRACKS_KEY, &tracks).unwrap();

        let data = dashboard.gather().await;

        assert_eq!(data.exchange_rates, Some(rates));
        assert_eq!(data.tracks, tracks);
    }

    #[tokio::test]
    async fn test_gather_substitutes_placeholders_for_failed_sources() {
        let (dashboard, temp_dir) = offline_dashboard();

        let data = dashboard.gather().await;

        assert!(data.weather.is_empty());
        assert!(data.exchange_rates.is_none());
        assert!(data.movies.is_empty());
        assert!(data.tracks.is_empty());
        assert!(data.events.is_empty());
        assert!(data.news.is_empty());
        assert!(!data.last_update.is_empty());
        assert!(!temp_dir.path().join(WEATHER_KEY).exists());
        assert!(!temp_dir.path().join(EXCHANGE_RATES_KEY).exists());
    }

    #[tokio::test]
    async fn test_gather_news_keeps_sections_for_failed_feeds() {
        let (mut dashboard, temp_dir) = offline_dashboard();
        dashboard.feeds = vec![
            FeedCategory::new("Gündem", &["http://127.0.0.1:9/gundem.rss"]),
            FeedCategory::new("Spor", &[]),
        ];

        let sections = dashboard.gather_news().await;

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].category, "Gündem");
        assert!(sections[0].items.is_empty());
        assert_eq!(sections[1].category, "Spor");
        let cached_files = std::fs::read_dir(temp_dir.path())
            .map(|entries| entries.count())
            .unwrap_or(0);
        assert_eq!(cached_files, 0, "headlines must never be cached");
    }

    #[test]
    fn test_dashboard_new_clamps_feed_concurrency() {
        let mut config = DashboardConfig::new("/tmp/gundem");
        config.max_concurrent_feeds = 0;

        let dashboard = Dashboard::new(config);

        assert_eq!(dashboard.max_concurrent_feeds, 1);
        assert_eq!(dashboard.cache().cache_dir(), std::path::Path::new("/tmp/gundem"));
    }
}
