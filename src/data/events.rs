//! Ticketmaster discovery client for upcoming events in Turkey

use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use super::{http_client, Event, FetchError};

const TICKETMASTER_EVENTS_URL: &str = "https://app.ticketmaster.com/discovery/v2/events.json";

const PLACEHOLDER_IMAGE_URL: &str = "https://via.placeholder.com/300x200.png?text=Etkinlik";

/// Number of events requested by default
const DEFAULT_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
struct DiscoveryResponse {
    #[serde(rename = "_embedded")]
    embedded: Option<EmbeddedEvents>,
}

#[derive(Debug, Deserialize)]
struct EmbeddedEvents {
    #[serde(default)]
    events: Vec<TmEvent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TmEvent {
    name: Option<String>,
    url: Option<String>,
    images: Vec<TmImage>,
    dates: Option<TmDates>,
    classifications: Vec<TmClassification>,
    #[serde(rename = "_embedded")]
    embedded: Option<TmEventEmbedded>,
}

#[derive(Debug, Deserialize)]
struct TmImage {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TmDates {
    start: Option<TmStart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TmStart {
    local_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TmClassification {
    segment: Option<Named>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TmEventEmbedded {
    venues: Vec<TmVenue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TmVenue {
    name: Option<String>,
    city: Option<Named>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Named {
    name: Option<String>,
}

/// Client for the Ticketmaster discovery API
#[derive(Debug, Clone)]
pub struct TicketmasterClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    limit: usize,
}

impl TicketmasterClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: http_client(),
            api_key,
            base_url: TICKETMASTER_EVENTS_URL.to_string(),
            limit: DEFAULT_LIMIT,
        }
    }

    /// Point the client at a different endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch upcoming events in Turkey, soonest first
    pub async fn fetch_events(&self) -> Result<Vec<Event>, FetchError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(FetchError::MissingCredentials("Ticketmaster"))?;

        info!("fetching Ticketmaster events");
        let size = self.limit.to_string();
        let text = self
            .client
            .get(&self.base_url)
            .query(&[
                ("apikey", api_key),
                ("countryCode", "TR"),
                ("size", size.as_str()),
                ("sort", "date,asc"),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let events = parse_events(&text)?;
        info!(count = events.len(), "events fetched");
        Ok(events)
    }
}

/// Flatten a discovery response; a response without `_embedded` has no events
fn parse_events(body: &str) -> Result<Vec<Event>, FetchError> {
    let response: DiscoveryResponse = serde_json::from_str(body)?;
    let Some(embedded) = response.embedded else {
        return Ok(Vec::new());
    };

    Ok(embedded.events.into_iter().map(into_event).collect())
}

fn into_event(event: TmEvent) -> Event {
    let venue = event
        .embedded
        .and_then(|e| e.venues.into_iter().next())
        .unwrap_or_default();

    Event {
        title: event.name.unwrap_or_else(|| "Başlık Yok".to_string()),
        link: event.url.unwrap_or_else(|| "#".to_string()),
        image_url: event
            .images
            .into_iter()
            .next()
            .map(|image| image.url)
            .unwrap_or_else(|| PLACEHOLDER_IMAGE_URL.to_string()),
        date_str: event
            .dates
            .and_then(|d| d.start)
            .and_then(|s| s.local_date)
            .unwrap_or_else(|| "Tarih Belirtilmemiş".to_string()),
        venue: venue
            .name
            .unwrap_or_else(|| "Mekan Belirtilmemiş".to_string()),
        location: venue
            .city
            .and_then(|c| c.name)
            .unwrap_or_else(|| "Şehir Belirtilmemiş".to_string()),
        category: event
            .classifications
            .into_iter()
            .next()
            .and_then(|c| c.segment)
            .and_then(|s| s.name)
            .unwrap_or_else(|| "Genel".to_string()),
    }
}
