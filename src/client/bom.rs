use crate::error::{ProcessingError, Result};
use crate::utils::text::decode_feed;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::debug;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Fetches BOM products. The Bureau rejects requests without a browser-like
/// user agent.
#[derive(Debug, Clone)]
pub struct BomClient {
    client: Client,
}

impl BomClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Body as text, UTF-8 or Windows-1252.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let bytes = self.get_bytes(url).await?;
        Ok(decode_feed(&bytes))
    }

    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let url = parse_http_url(url)?;
        debug!(%url, "GET");

        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Parse a feed URL, refusing anything but HTTP(S).
pub fn parse_http_url(url: &str) -> Result<Url> {
    let parsed =
        Url::parse(url).map_err(|e| ProcessingError::Config(format!("Invalid URL '{}': {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        _ => Err(ProcessingError::UnsupportedScheme(url.to_string())),
    }
}
