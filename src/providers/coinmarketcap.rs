//! CoinMarketCap endpoints: listing download and batched quote lookup.

use crate::core::config::ProviderConfig;
use crate::core::currency::ListingEntry;
use crate::core::fetch::{FetchFailure, JsonFetcher};
use crate::core::quote::QuoteData;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

#[derive(Deserialize, Debug)]
struct ListingResponse {
    data: Vec<ListingEntry>,
}

#[derive(Deserialize, Debug)]
struct QuotesResponse {
    data: Value,
}

/// Extracts the API-reported error from a response envelope.
///
/// Current responses carry `status.error_code` (zero on success), legacy
/// responses carry `metadata.error` (null on success).
pub fn api_error(body: &Value) -> Option<String> {
    if let Some(status) = body.get("status") {
        let code = status
            .get("error_code")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        if code != 0 {
            let message = status
                .get("error_message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Some(format!("API error {code}: {message}"));
        }
    }

    match body.get("metadata").and_then(|metadata| metadata.get("error")) {
        Some(Value::Null) | None => None,
        Some(Value::String(message)) => Some(format!("API error: {message}")),
        Some(other) => Some(format!("API error: {other}")),
    }
}

fn join_url(base: &str, version: &str, endpoint: &str) -> String {
    format!(
        "{}/{}/{}",
        base.trim_end_matches('/'),
        version.trim_matches('/'),
        endpoint.trim_matches('/')
    )
}

pub struct CoinMarketCapApi {
    config: ProviderConfig,
    fetcher: Arc<dyn JsonFetcher>,
}

impl CoinMarketCapApi {
    pub fn new(config: ProviderConfig, fetcher: Arc<dyn JsonFetcher>) -> Self {
        Self { config, fetcher }
    }

    pub fn listings_url(&self) -> String {
        join_url(
            &self.config.base_url,
            &self.config.api_version,
            &self.config.listings_endpoint,
        )
    }

    /// Batched ticker URL. Ids are sent comma-joined, the conversion code is
    /// form-encoded.
    pub fn quotes_url(&self, ids: &[u64], convert: &str) -> Result<String, FetchFailure> {
        let endpoint = join_url(
            &self.config.base_url,
            &self.config.api_version,
            &self.config.ticker_endpoint,
        );
        let mut url = Url::parse(&endpoint)
            .map_err(|e| FetchFailure::new(None, format!("Invalid ticker URL {endpoint}: {e}")))?;

        let ids = ids
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        url.set_query(Some(&format!("id={ids}")));
        url.query_pairs_mut().append_pair("convert", convert);
        Ok(url.to_string())
    }

    async fn get_json(&self, url: &str) -> Result<Value, FetchFailure> {
        debug!("Requesting {}", url);
        let (status, body) = self
            .fetcher
            .fetch(url, self.config.api_key.as_deref())
            .await
            .into_result()?;

        match api_error(&body) {
            Some(error) => Err(FetchFailure::new(Some(status), error)),
            None => Ok(body),
        }
    }

    /// Downloads the canonical listing. One attempt.
    #[instrument(name = "ListingFetch", skip(self))]
    pub async fn fetch_listings(&self) -> Result<Vec<ListingEntry>, FetchFailure> {
        let body = self.get_json(&self.listings_url()).await?;
        let response: ListingResponse = serde_json::from_value(body)
            .map_err(|e| FetchFailure::new(Some(200), format!("Failed to parse listing: {e}")))?;
        debug!(entries = response.data.len(), "Listing downloaded");
        Ok(response.data)
    }

    /// Fetches quotes for all `ids` in one request. One attempt.
    #[instrument(name = "QuotesFetch", skip(self, ids), fields(count = ids.len()))]
    pub async fn fetch_quotes(
        &self,
        ids: &[u64],
        convert: &str,
    ) -> Result<HashMap<u64, QuoteData>, FetchFailure> {
        let url = self.quotes_url(ids, convert)?;
        let body = self.get_json(&url).await?;
        let response: QuotesResponse = serde_json::from_value(body)
            .map_err(|e| FetchFailure::new(Some(200), format!("Failed to parse quotes: {e}")))?;
        parse_quotes(response.data)
    }
}

// `data` is a map keyed by id, or a single currency object in the
// per-currency ticker layout.
fn parse_quotes(data: Value) -> Result<HashMap<u64, QuoteData>, FetchFailure> {
    let Value::Object(map) = data else {
        return Err(FetchFailure::new(
            Some(200),
            "Failed to parse quotes: data is not an object",
        ));
    };

    if let Some(id) = map.get("id").and_then(Value::as_u64) {
        return Ok(HashMap::from([(id, QuoteData::new(Value::Object(map)))]));
    }

    let mut quotes = HashMap::with_capacity(map.len());
    for (key, value) in map {
        match key.parse::<u64>() {
            Ok(id) => {
                quotes.insert(id, QuoteData::new(value));
            }
            Err(_) => warn!(key = %key, "Skipping quote with a non-numeric id"),
        }
    }
    Ok(quotes)
}
