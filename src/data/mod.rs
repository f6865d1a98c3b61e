//! Data sources and record types for the dashboard
//!
//! Each submodule wraps one third-party API. Clients return `Result<_, FetchError>`
//! and never substitute placeholders themselves; that is left to the aggregator.

pub mod events;
pub mod exchange;
pub mod feeds;
pub mod movies;
pub mod spotify;
pub mod weather;

pub use events::TicketmasterClient;
pub use exchange::ExchangeRateClient;
pub use feeds::{FeedCategory, RssClient};
pub use movies::MoviesClient;
pub use spotify::{SpotifyClient, SpotifyCredentials};
pub use weather::{weather_class_for, WeatherClient, WeatherSettings};

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Timeout applied to every outgoing request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur when fetching from a data source
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed or returned an error status
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Failed to parse an RSS document
    #[error("Failed to parse feed: {0}")]
    FeedError(#[from] ::rss::Error),

    /// No API key or token configured for the source
    #[error("Missing credentials for {0}")]
    MissingCredentials(&'static str),

    /// Missing expected field in response
    #[error("Missing expected field in response: {0}")]
    MissingField(String),

    /// The API answered but reported a problem
    #[error("API error: {0}")]
    Api(String),
}

/// Builds the HTTP client shared by a data source
pub(crate) fn http_client() -> Client {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Visual category of a forecast, used as a CSS class by the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeatherClass {
    #[serde(rename = "sunny")]
    Sunny,
    #[serde(rename = "rainy")]
    Rainy,
    #[serde(rename = "snowy")]
    Snowy,
    #[serde(rename = "cloudy")]
    Cloudy,
    #[serde(rename = "default-weather")]
    Default,
}

/// One forecast slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyForecast {
    /// Local time of the slot, `HH:MM`
    pub time: String,
    /// Temperature in the configured units
    pub temperature: f64,
    /// Capitalized condition description
    pub description: String,
    /// Condition icon
    pub icon_url: String,
    pub weather_class: WeatherClass,
}

/// Lira exchange rates derived from a USD-based quote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRates {
    #[serde(rename = "USDTRY")]
    pub usd_try: f64,
    /// Absent when the EUR cross rate was missing
    #[serde(rename = "EURTRY", default, skip_serializing_if = "Option::is_none")]
    pub eur_try: Option<f64>,
    /// Absent when the GBP cross rate was missing
    #[serde(rename = "GBPTRY", default, skip_serializing_if = "Option::is_none")]
    pub gbp_try: Option<f64>,
}

/// A film currently in theaters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
}

/// A playlist track with its embeddable player URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub artist: String,
    pub title: String,
    pub embed_url: String,
}

/// An upcoming event listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub title: String,
    pub link: String,
    pub image_url: String,
    /// Local date as reported by the API, or a placeholder
    pub date_str: String,
    pub venue: String,
    pub location: String,
    pub category: String,
}

/// A single headline from an RSS feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    /// Feed title
    pub source: String,
    pub title: String,
    pub link: String,
    /// Description with markup stripped
    pub summary: String,
    /// Publication date as it appeared in the feed
    pub pub_date: Option<String>,
    /// Parsed publication time, used for ordering
    pub published_at: DateTime<Utc>,
}

/// Rounds to two decimal places
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(32.1049), 32.1);
        assert_eq!(round2(34.876), 34.88);
    }

    #[test]
    fn test_weather_class_serializes_as_css_class() {
        assert_eq!(serde_json::to_string(&WeatherClass::Sunny).unwrap(), "\"sunny\"");
        assert_eq!(
            serde_json::to_string(&WeatherClass::Default).unwrap(),
            "\"default-weather\""
        );
    }

    #[test]
    fn test_exchange_rates_use_pair_names() {
        let rates = ExchangeRates {
            usd_try: 32.1,
            eur_try: None,
            gbp_try: Some(40.5),
        };
        let json = serde_json::to_value(&rates).unwrap();
        assert_eq!(json, serde_json::json!({"USDTRY": 32.1, "GBPTRY": 40.5}));
    }

    #[test]
    fn test_fetch_error_messages() {
        assert_eq!(
            FetchError::MissingCredentials("TMDB").to_string(),
            "Missing credentials for TMDB"
        );
        assert!(FetchError::MissingField("rates.TRY".to_string())
            .to_string()
            .contains("rates.TRY"));
    }
}
