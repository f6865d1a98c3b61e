//! Command-line interface parsing for the dashboard
//!
//! Handles clap argument parsing, with environment-variable fallbacks for the cache
//! directory and every API credential, and turns the result into a `DashboardConfig`.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::cache::default_cache_dir;
use crate::config::{CacheTtls, DashboardConfig};
use crate::data::{SpotifyCredentials, WeatherSettings};

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// Neither --cache-dir nor a home directory is available
    #[error("No cache directory: pass --cache-dir or set GUNDEM_CACHE_DIR")]
    NoCacheDir,

    /// The city name is blank
    #[error("Invalid city: '{0}'. A city name is required for the weather forecast")]
    InvalidCity(String),
}

/// Gündem - a personal news dashboard
#[derive(Parser, Debug)]
#[command(name = "gundem")]
#[command(about = "Gathers weather, exchange rates, films, music, events and headlines into one dashboard")]
#[command(version)]
pub struct Cli {
    /// Directory holding cached source data
    #[arg(long, env = "GUNDEM_CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Serve cached data for this many minutes, for every source
    #[arg(long, value_name = "MINUTES")]
    pub ttl_minutes: Option<u64>,

    /// Ignore cached data and fetch every source again
    #[arg(long, conflicts_with = "ttl_minutes")]
    pub refresh: bool,

    /// Write the dashboard JSON to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// City for the weather forecast
    #[arg(long, default_value = "Istanbul")]
    pub city: String,

    /// Units for the weather forecast (metric, imperial, standard)
    #[arg(long, default_value = "metric")]
    pub units: String,

    /// Language of the weather descriptions
    #[arg(long, default_value = "tr")]
    pub lang: String,

    /// Offset from UTC used to display forecast times (-12 to 14)
    #[arg(
        long,
        default_value_t = 3,
        allow_negative_numbers = true,
        value_parser = clap::value_parser!(i64).range(-12..=14),
        value_name = "HOURS"
    )]
    pub utc_offset_hours: i64,

    /// OpenWeatherMap API key
    #[arg(long, env = "OPENWEATHER_API_KEY", hide_env_values = true)]
    pub openweather_api_key: Option<String>,

    /// TMDB API key
    #[arg(long, env = "TMDB_API_KEY", hide_env_values = true)]
    pub tmdb_api_key: Option<String>,

    /// Spotify application client id
    #[arg(long, env = "SPOTIFY_CLIENT_ID", hide_env_values = true)]
    pub spotify_client_id: Option<String>,

    /// Spotify application client secret
    #[arg(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
    pub spotify_client_secret: Option<String>,

    /// Spotify refresh token for the playlist account
    #[arg(long, env = "SPOTIFY_REFRESH_TOKEN", hide_env_values = true)]
    pub spotify_refresh_token: Option<String>,

    /// Ticketmaster discovery API key
    #[arg(long, env = "TICKETMASTER_API_KEY", hide_env_values = true)]
    pub ticketmaster_api_key: Option<String>,
}

impl Cli {
    /// Cache windows implied by --refresh and --ttl-minutes
    pub fn cache_ttls(&self) -> CacheTtls {
        if self.refresh {
            CacheTtls::uniform(Duration::ZERO)
        } else if let Some(minutes) = self.ttl_minutes {
            CacheTtls::uniform(Duration::from_secs(minutes.saturating_mul(60)))
        } else {
            CacheTtls::default()
        }
    }

    /// Spotify credentials, only when all three parts are present
    pub fn spotify_credentials(&self) -> Option<SpotifyCredentials> {
        Some(SpotifyCredentials {
            client_id: non_blank(&self.spotify_client_id)?,
            client_secret: non_blank(&self.spotify_client_secret)?,
            refresh_token: non_blank(&self.spotify_refresh_token)?,
        })
    }
}

impl DashboardConfig {
    /// Creates a DashboardConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(DashboardConfig)` with defaults for anything not given
    /// * `Err(CliError)` if no cache directory can be resolved or the city is blank
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let cache_dir = cli
            .cache_dir
            .clone()
            .or_else(default_cache_dir)
            .ok_or(CliError::NoCacheDir)?;

        let city = cli.city.trim();
        if city.is_empty() {
            return Err(CliError::InvalidCity(cli.city.clone()));
        }

        let mut config = DashboardConfig::new(cache_dir);
        config.ttls = cli.cache_ttls();
        config.weather = WeatherSettings {
            api_key: non_blank(&cli.openweather_api_key),
            city: city.to_string(),
            units: cli.units.clone(),
            lang: cli.lang.clone(),
            utc_offset_hours: cli.utc_offset_hours,
        };
        config.tmdb_api_key = non_blank(&cli.tmdb_api_key);
        config.spotify = cli.spotify_credentials();
        config.ticketmaster_api_key = non_blank(&cli.ticketmaster_api_key);
        Ok(config)
    }
}

/// Treats empty or whitespace-only values as absent
fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
