use crate::core::fetch::{FetchOutcome, JsonFetcher};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

pub const API_KEY_HEADER: &str = "X-CMC_PRO_API_KEY";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// [`JsonFetcher`] backed by a shared `reqwest` client.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("coinboard/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl JsonFetcher for HttpFetcher {
    #[instrument(name = "HttpFetch", skip(self, api_key), fields(url = %url))]
    async fn fetch(&self, url: &str, api_key: Option<&str>) -> FetchOutcome {
        let mut request = self.client.get(url).header(ACCEPT, "application/json");
        if let Some(key) = api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return FetchOutcome::failure(None, format!("Request error: {e} URL: {url}")),
        };
        debug!(status = %response.status(), "Received response");

        let status = response.status();
        if status != StatusCode::OK {
            return FetchOutcome::failure(Some(status.as_u16()), format!("HTTP error: {status}"));
        }

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                return FetchOutcome::failure(
                    Some(status.as_u16()),
                    format!("Failed to read response body: {e}"),
                );
            }
        };

        match serde_json::from_str::<Value>(&text) {
            Ok(body) => FetchOutcome::Success {
                status: status.as_u16(),
                body,
            },
            Err(e) => FetchOutcome::failure(
                Some(status.as_u16()),
                format!("Failed to parse JSON response: {e}"),
            ),
        }
    }
}
