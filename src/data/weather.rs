//! OpenWeatherMap forecast client
//!
//! Fetches the 5-day / 3-hour forecast for a city and turns the first few slots
//! into display-ready `HourlyForecast` records.

use chrono::{DateTime, Duration};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use super::{http_client, FetchError, HourlyForecast, WeatherClass};

/// Base URL for the OpenWeatherMap forecast API
const OPENWEATHER_FORECAST_URL: &str = "https://api.openweathermap.org/data/2.5/forecast";

/// Icon shown when a slot carries no icon code
const PLACEHOLDER_ICON_URL: &str = "https://via.placeholder.com/50";

/// Number of forecast slots kept by default
const DEFAULT_LIMIT: usize = 8;

/// Where and how to request the forecast
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSettings {
    /// OpenWeatherMap API key
    pub api_key: Option<String>,
    /// City name passed as the `q` parameter
    pub city: String,
    /// `metric`, `imperial` or `standard`
    pub units: String,
    /// Language of the condition descriptions
    pub lang: String,
    /// Offset added to UTC slot times for display
    pub utc_offset_hours: i64,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            city: "Istanbul".to_string(),
            units: "metric".to_string(),
            lang: "tr".to_string(),
            utc_offset_hours: 3,
        }
    }
}

/// Client for fetching forecasts from OpenWeatherMap
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    settings: WeatherSettings,
    base_url: String,
    limit: usize,
}

impl WeatherClient {
    /// Create a new WeatherClient for the given settings
    pub fn new(settings: WeatherSettings) -> Self {
        Self {
            client: http_client(),
            settings,
            base_url: OPENWEATHER_FORECAST_URL.to_string(),
            limit: DEFAULT_LIMIT,
        }
    }

    /// Point the client at a different endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Change how many forecast slots are kept
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Fetch the upcoming forecast slots for the configured city
    ///
    /// # Returns
    /// * `Ok(Vec<HourlyForecast>)` - Up to `limit` slots, in API order
    /// * `Err(FetchError)` - Missing API key, HTTP failure, or a response without `list`
    pub async fn fetch_forecast(&self) -> Result<Vec<HourlyForecast>, FetchError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or(FetchError::MissingCredentials("OpenWeatherMap"))?;

        info!(city = %self.settings.city, "fetching weather forecast");
        let text = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", self.settings.city.as_str()),
                ("appid", api_key),
                ("units", self.settings.units.as_str()),
                ("lang", self.settings.lang.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let forecast = parse_forecast(&text, self.settings.utc_offset_hours, self.limit)?;
        info!(count = forecast.len(), "weather forecast fetched");
        Ok(forecast)
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    list: Option<Vec<Value>>,
    message: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ForecastItem {
    dt: i64,
    main: MainReadings,
    weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
    icon: Option<String>,
}

/// Parse a forecast response body, skipping individual slots that are malformed
fn parse_forecast(
    body: &str,
    utc_offset_hours: i64,
    limit: usize,
) -> Result<Vec<HourlyForecast>, FetchError> {
    let response: ForecastResponse = serde_json::from_str(body)?;
    let list = response.list.ok_or_else(|| {
        FetchError::Api(
            response
                .message
                .map(|m| m.as_str().map(str::to_string).unwrap_or_else(|| m.to_string()))
                .unwrap_or_else(|| "forecast response has no list".to_string()),
        )
    })?;

    let mut forecast = Vec::with_capacity(limit.min(list.len()));
    for raw in list {
        if forecast.len() >= limit {
            break;
        }
        match parse_item(raw, utc_offset_hours) {
            Some(slot) => forecast.push(slot),
            None => warn!("skipping malformed forecast slot"),
        }
    }
    Ok(forecast)
}

fn parse_item(raw: Value, utc_offset_hours: i64) -> Option<HourlyForecast> {
    let item: ForecastItem = serde_json::from_value(raw).ok()?;
    let condition = item.weather.first()?;
    let offset = Duration::try_hours(utc_offset_hours)?;
    let local = DateTime::from_timestamp(item.dt, 0)?.checked_add_signed(offset)?;
    let description = capitalize(&condition.description);

    Some(HourlyForecast {
        time: local.format("%H:%M").to_string(),
        temperature: item.main.temp,
        weather_class: weather_class_for(&description),
        icon_url: condition
            .icon
            .as_deref()
            .map(|icon| format!("https://openweathermap.org/img/wn/{}@2x.png", icon))
            .unwrap_or_else(|| PLACEHOLDER_ICON_URL.to_string()),
        description,
    })
}

/// Map a condition description (Turkish or English) to its display class
pub fn weather_class_for(description: &str) -> WeatherClass {
    let lower = description.to_lowercase();
    let has_any = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if has_any(&["açık", "güneşli", "clear", "sunny"]) {
        WeatherClass::Sunny
    } else if has_any(&["yağmur", "sağanak", "rain", "shower"]) {
        WeatherClass::Rainy
    } else if has_any(&["kar", "snow"]) {
        WeatherClass::Snowy
    } else if has_any(&["bulut", "kapalı", "cloud", "overcast"]) {
        WeatherClass::Cloudy
    } else {
        WeatherClass::Default
    }
}

/// Uppercase the first character and lowercase the rest
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
