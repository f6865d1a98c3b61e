//! Spotify playlist client
//!
//! Exchanges a long-lived refresh token for an access token, then lists the tracks
//! of a playlist as embeddable players.

use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use super::{http_client, FetchError, Track};

const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";

/// Playlist shown on the dashboard by default
pub const DEFAULT_PLAYLIST_ID: &str = "42QvezcAoVfm9pdUQzM6xy";

/// Number of tracks kept by default
const DEFAULT_LIMIT: usize = 10;

/// OAuth client credentials plus a refresh token
#[derive(Debug, Clone, PartialEq)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistTracksResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    track: Option<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    id: Option<String>,
    name: Option<String>,
    #[serde(default)]
    artists: Vec<Artist>,
}

#[derive(Debug, Deserialize)]
struct Artist {
    name: Option<String>,
}

/// Client for a single Spotify playlist
#[derive(Debug, Clone)]
pub struct SpotifyClient {
    client: Client,
    credentials: Option<SpotifyCredentials>,
    playlist_id: String,
    token_url: String,
    api_url: String,
    limit: usize,
}

impl SpotifyClient {
    pub fn new(credentials: Option<SpotifyCredentials>) -> Self {
        Self {
            client: http_client(),
            credentials,
            playlist_id: DEFAULT_PLAYLIST_ID.to_string(),
            token_url: SPOTIFY_TOKEN_URL.to_string(),
            api_url: SPOTIFY_API_URL.to_string(),
            limit: DEFAULT_LIMIT,
        }
    }

    /// Use a different playlist
    pub fn with_playlist(mut self, playlist_id: impl Into<String>) -> Self {
        self.playlist_id = playlist_id.into();
        self
    }

    /// Point the client at different token and API endpoints
    pub fn with_endpoints(mut self, token_url: impl Into<String>, api_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self.api_url = api_url.into();
        self
    }

    /// Fetch the playlist's first tracks
    pub async fn fetch_tracks(&self) -> Result<Vec<Track>, FetchError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(FetchError::MissingCredentials("Spotify"))?;

        info!(playlist = %self.playlist_id, "fetching playlist tracks");
        let token = self.access_token(credentials).await?;

        let text = self
            .client
            .get(format!("{}/playlists/{}/tracks", self.api_url, self.playlist_id))
            .query(&[("market", "from_token"), ("limit", "50")])
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let tracks = parse_tracks(&text, self.limit)?;
        info!(count = tracks.len(), "playlist tracks fetched");
        Ok(tracks)
    }

    async fn access_token(&self, credentials: &SpotifyCredentials) -> Result<String, FetchError> {
        let text = self
            .client
            .post(&self.token_url)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", credentials.refresh_token.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_token(&text)
    }
}

fn parse_token(body: &str) -> Result<String, FetchError> {
    let response: TokenResponse = serde_json::from_str(body)?;
    response
        .access_token
        .ok_or_else(|| FetchError::MissingField("access_token".to_string()))
}

/// Convert playlist items into tracks, skipping local files and removed tracks
fn parse_tracks(body: &str, limit: usize) -> Result<Vec<Track>, FetchError> {
    let response: PlaylistTracksResponse = serde_json::from_str(body)?;

    let tracks = response
        .items
        .into_iter()
        .filter_map(|item| {
            let track = item.track?;
            let id = track.id.filter(|id| !id.is_empty())?;
            let artist = track
                .artists
                .into_iter()
                .map(|a| a.name.unwrap_or_else(|| "Bilinmeyen Sanatçı".to_string()))
                .collect::<Vec<_>>()
                .join(", ");

            Some(Track {
                artist,
                title: track.name.unwrap_or_else(|| "Bilinmeyen Şarkı".to_string()),
                embed_url: format!("https://open.spotify.com/embed/track/{}", id),
            })
        })
        .take(limit)
        .collect();

    Ok(tracks)
}
