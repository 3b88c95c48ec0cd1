//! CoinMarketCap listings fetcher.
//!
//! One call to `/v1/cryptocurrency/listings/latest` returns price and
//! percentage changes for the top N coins, which is everything the alert
//! evaluator needs per poll cycle.

use crate::FeedError;
use chrono::Utc;
use coinwatch_core::CoinSnapshot;
use compact_str::CompactString;
use serde::Deserialize;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://pro-api.coinmarketcap.com";
const API_KEY_HEADER: &str = "X-CMC_PRO_API_KEY";

#[derive(Debug, Deserialize)]
struct ListingsResponse {
    data: Vec<Listing>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    symbol: String,
    quote: Quote,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(rename = "USD")]
    usd: UsdQuote,
}

#[derive(Debug, Deserialize)]
struct UsdQuote {
    price: f64,
    #[serde(default)]
    percent_change_1h: Option<f64>,
    #[serde(default)]
    percent_change_24h: Option<f64>,
    #[serde(default)]
    percent_change_7d: Option<f64>,
    #[serde(default)]
    percent_change_30d: Option<f64>,
}

/// CoinMarketCap REST client.
pub struct CmcClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl CmcClient {
    /// Create a client with the production endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client against a custom endpoint (sandbox, test server).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Fetch the top `limit` listings as snapshots.
    pub async fn fetch_listings(&self, limit: u32) -> Result<Vec<CoinSnapshot>, FeedError> {
        let url = format!("{}/v1/cryptocurrency/listings/latest", self.base_url);

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .query(&[("limit", limit.to_string()), ("convert", "USD".into())])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(FeedError::Unauthorized);
        }
        if status.as_u16() == 429 {
            return Err(FeedError::RateLimitExceeded);
        }
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let snapshots = parse_listings(&body)?;
        debug!(count = snapshots.len(), "Fetched CMC listings");
        Ok(snapshots)
    }
}

/// Parse a listings response body into snapshots.
fn parse_listings(body: &str) -> Result<Vec<CoinSnapshot>, FeedError> {
    let response: ListingsResponse = serde_json::from_str(body)?;
    let fetched_at = Utc::now();

    let snapshots = response
        .data
        .into_iter()
        .map(|listing| CoinSnapshot {
            symbol: CompactString::new(&listing.symbol),
            price: listing.quote.usd.price,
            pct_change_1h: listing.quote.usd.percent_change_1h,
            pct_change_24h: listing.quote.usd.percent_change_24h,
            pct_change_7d: listing.quote.usd.percent_change_7d,
            pct_change_30d: listing.quote.usd.percent_change_30d,
            fetched_at,
        })
        .collect();

    Ok(snapshots)
}
