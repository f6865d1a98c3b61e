//! TMDB now-playing client

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use super::{http_client, FetchError, Movie};

/// TMDB now-playing endpoint
const TMDB_NOW_PLAYING_URL: &str = "https://api.themoviedb.org/3/movie/now_playing";

/// Number of films kept by default
const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
struct NowPlayingResponse {
    #[serde(default)]
    results: Vec<Value>,
}

/// Client for films currently showing in Turkish theaters
#[derive(Debug, Clone)]
pub struct MoviesClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    limit: usize,
}

impl MoviesClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: http_client(),
            api_key,
            base_url: TMDB_NOW_PLAYING_URL.to_string(),
            limit: DEFAULT_LIMIT,
        }
    }

    /// Point the client at a different endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch the first page of now-playing films, truncated to the client's limit
    pub async fn fetch_now_playing(&self) -> Result<Vec<Movie>, FetchError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(FetchError::MissingCredentials("TMDB"))?;

        info!("fetching now-playing movies");
        let text = self
            .client
            .get(&self.base_url)
            .query(&[
                ("api_key", api_key),
                ("language", "tr-TR"),
                ("region", "TR"),
                ("page", "1"),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let movies = parse_now_playing(&text, self.limit)?;
        info!(count = movies.len(), "movies fetched");
        Ok(movies)
    }
}

/// Parse a now-playing page, skipping results that lack an id or title
fn parse_now_playing(body: &str, limit: usize) -> Result<Vec<Movie>, FetchError> {
    let response: NowPlayingResponse = serde_json::from_str(body)?;

    let mut movies = Vec::with_capacity(limit.min(response.results.len()));
    for raw in response.results {
        if movies.len() >= limit {
            break;
        }
        match serde_json::from_value::<Movie>(raw) {
            Ok(movie) => movies.push(movie),
            Err(err) => warn!(error = %err, "skipping malformed movie result"),
        }
    }
    Ok(movies)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_RESPONSE: &str = r#"{
        "dates": {"maximum": "2024-06-19", "minimum": "2024-05-08"},
        "page": 1,
        "results": [
            {
                "adult": false,
                "id": 653346,
                "title": "Maymunlar Cehennemi: Yeni Krallık",
                "overview": "Sezar'ın saltanatından birkaç nesil sonra...",
                "poster_path": "/gKkl37BQuKTanygYQG1pyYgLVgf.jpg",
                "release_date": "2024-05-08",
                "vote_average": 7.1
            },
            {
                "id": 823464,
                "title": "Godzilla x Kong",
                "poster_path": null,
                "vote_average": 7.2
            },
            {"id": 1, "title": "Üçüncü"}
        ],
        "total_pages": 4
    }"#;

    #[test]
    fn test_parse_now_playing_keeps_fields() {
        let movies = parse_now_playing(VALID_RESPONSE, 10).unwrap();

        assert_eq!(movies.len(), 3);
        assert_eq!(movies[0].id, 653346);
        assert_eq!(movies[0].release_date.as_deref(), Some("2024-05-08"));
        assert!(movies[1].poster_path.is_none());
        assert_eq!(movies[1].overview, "");
        assert_eq!(movies[2].vote_average, 0.0);
    }

    #[test]
    fn test_parse_now_playing_truncates() {
        let movies = parse_now_playing(VALID_RESPONSE, 2).unwrap();
        assert_eq!(movies.len(), 2);
    }

    #[test]
    fn test_parse_now_playing_skips_incomplete_results() {
        let body = r#"{"results": [
            {"id": 10, "overview": "başlıksız"},
            {"title": "Kimliksiz"},
            {"id": 11, "title": "Tam Kayıt"}
        ]}"#;

        let movies = parse_now_playing(body, 10).unwrap();

        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].id, 11);
        assert_eq!(movies[0].title, "Tam Kayıt");
    }

    #[test]
    fn test_parse_now_playing_without_results_is_empty() {
        let movies = parse_now_playing(r#"{"page": 1}"#, 10).unwrap();
        assert!(movies.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_without_api_key_fails_fast() {
        let result = MoviesClient::new(None).fetch_now_playing().await;
        assert!(matches!(result, Err(FetchError::MissingCredentials("TMDB"))));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_request_error() {
        let client = MoviesClient::new(Some("key".to_string()))
            .with_base_url("http://127.0.0.1:9/movie/now_playing");
        let result = client.fetch_now_playing().await;
        assert!(matches!(result, Err(FetchError::RequestFailed(_))));
    }
}
