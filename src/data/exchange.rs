//! Exchange rate client
//!
//! Derives lira rates from the USD-based quote published by exchangerate-api.

use std::collections::HashMap;

use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use super::{http_client, round2, ExchangeRates, FetchError};

/// Latest USD-based rates
const EXCHANGE_RATE_API_URL: &str = "https://api.exchangerate-api.com/v4/latest/USD";

#[derive(Debug, Deserialize)]
struct RatesResponse {
    #[serde(default)]
    rates: HashMap<String, f64>,
}

/// Client for the exchangerate-api latest-rates endpoint
#[derive(Debug, Clone)]
pub struct ExchangeRateClient {
    client: Client,
    url: String,
}

impl Default for ExchangeRateClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ExchangeRateClient {
    pub fn new() -> Self {
        Self {
            client: http_client(),
            url: EXCHANGE_RATE_API_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Fetch USD, EUR and GBP rates against the lira
    pub async fn fetch_rates(&self) -> Result<ExchangeRates, FetchError> {
        info!("fetching exchange rates");
        let text = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let rates = parse_rates(&text)?;
        info!(usd_try = rates.usd_try, "exchange rates fetched");
        Ok(rates)
    }
}

/// Derive lira rates from a USD-based response body
///
/// EUR and GBP are quoted per USD, so their lira rate is `USDTRY / rate`.
fn parse_rates(body: &str) -> Result<ExchangeRates, FetchError> {
    let response: RatesResponse = serde_json::from_str(body)?;

    let usd_try = response
        .rates
        .get("TRY")
        .copied()
        .filter(|rate| *rate > 0.0)
        .ok_or_else(|| FetchError::MissingField("rates.TRY".to_string()))?;

    let cross = |currency: &str| {
        response
            .rates
            .get(currency)
            .copied()
            .filter(|rate| *rate != 0.0)
            .map(|rate| round2(usd_try / rate))
    };

    Ok(ExchangeRates {
        usd_try: round2(usd_try),
        eur_try: cross("EUR"),
        gbp_try: cross("GBP"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rates_derives_cross_rates() {
        let body = r#"{
            "provider": "https://www.exchangerate-api.com",
            "base": "USD",
            "date": "2024-05-20",
            "rates": {"USD": 1, "TRY": 32.1049, "EUR": 0.92, "GBP": 0.79}
        }"#;

        let rates = parse_rates(body).unwrap();

        assert_eq!(rates.usd_try, 32.1);
        assert_eq!(rates.eur_try, Some(34.9));
        assert_eq!(rates.gbp_try, Some(40.64));
    }

    #[test]
    fn test_parse_rates_without_cross_rates() {
        let body = r#"{"rates": {"TRY": 32.4, "EUR": 0}}"#;

        let rates = parse_rates(body).unwrap();

        assert_eq!(rates.usd_try, 32.4);
        assert!(rates.eur_try.is_none());
        assert!(rates.gbp_try.is_none());
    }

    #[test]
    fn test_parse_rates_requires_try() {
        let body = r#"{"rates": {"EUR": 0.92}}"#;
        assert!(matches!(parse_rates(body), Err(FetchError::MissingField(_))));

        let body = r#"{"result": "error"}"#;
        assert!(matches!(parse_rates(body), Err(FetchError::MissingField(_))));
    }

    #[test]
    fn test_parse_rates_rejects_garbage() {
        assert!(matches!(parse_rates("<html>"), Err(FetchError::ParseError(_))));
    }
}
