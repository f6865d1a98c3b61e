//! Resolved runtime configuration for a dashboard run
//!
//! Built from command-line arguments and environment variables by `cli`, then handed
//! to `Dashboard::new`. Nothing here touches the filesystem.

use std::path::PathBuf;
use std::time::Duration;

use crate::data::feeds::default_feeds;
use crate::data::{FeedCategory, SpotifyCredentials, WeatherSettings};

/// Freshness windows for each cached source
#[derive(Debug, Clone, PartialEq)]
pub struct CacheTtls {
    pub weather: Duration,
    pub exchange_rates: Duration,
    pub movies: Duration,
    pub tracks: Duration,
    pub events: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            weather: Duration::from_secs(30 * 60),       // 30 minutes
            exchange_rates: Duration::from_secs(15 * 60), // 15 minutes
            movies: Duration::from_secs(6 * 60 * 60),     // 6 hours
            tracks: Duration::from_secs(12 * 60 * 60),    // 12 hours
            events: Duration::from_secs(6 * 60 * 60),     // 6 hours
        }
    }
}

impl CacheTtls {
    /// The same window for every source
    pub fn uniform(ttl: Duration) -> Self {
        Self {
            weather: ttl,
            exchange_rates: ttl,
            movies: ttl,
            tracks: ttl,
            events: ttl,
        }
    }
}

/// Everything a dashboard run needs
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Root directory of the cache records
    pub cache_dir: PathBuf,
    pub ttls: CacheTtls,
    pub weather: WeatherSettings,
    pub tmdb_api_key: Option<String>,
    pub spotify: Option<SpotifyCredentials>,
    pub ticketmaster_api_key: Option<String>,
    pub feeds: Vec<FeedCategory>,
    /// Upper bound on feeds fetched at the same time
    pub max_concurrent_feeds: usize,
}

impl DashboardConfig {
    /// Default configuration rooted at `cache_dir`, with no credentials
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ttls: CacheTtls::default(),
            weather: WeatherSettings::default(),
            tmdb_api_key: None,
            spotify: None,
            ticketmaster_api_key: None,
            feeds: default_feeds(),
            max_concurrent_feeds: 10,
        }
    }
}
