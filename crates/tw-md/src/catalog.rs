//! REST market discovery.
//!
//! A [`MarketCatalog`] is a URL plus a schema mapper. Each fetch builds its own
//! HTTP client, so connectors share nothing; retries are the caller's job.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};
use tw_core::Market;
use tw_core::error::{TwError, TwResult};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Maps an exchange's catalog body to markets. `Err` carries a description of
/// what was wrong with the body.
pub type MarketParser = fn(&Value) -> Result<Vec<Market>, String>;

pub struct MarketCatalog {
    label: &'static str,
    url: String,
    parse: MarketParser,
}

impl MarketCatalog {
    pub fn new(label: &'static str, url: impl Into<String>, parse: MarketParser) -> Self {
        Self { label, url: url.into(), parse }
    }

    /// Fetch and map the market list.
    ///
    /// Network failures, non-2xx statuses and bodies the mapper rejects are
    /// all [`TwError::CatalogFetch`].
    pub async fn fetch(&self) -> TwResult<Vec<Market>> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| TwError::CatalogFetch(format!("http client: {e}")))?;

        debug!("[{}] fetching markets from {}", self.label, self.url);
        let resp = client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| TwError::CatalogFetch(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TwError::CatalogFetch(format!("{} returned HTTP {status}", self.url)));
        }

        let body: Value =
            resp.json().await.map_err(|e| TwError::CatalogFetch(format!("malformed body: {e}")))?;
        let markets = (self.parse)(&body).map_err(TwError::CatalogFetch)?;

        info!("[{}] catalog: {} markets", self.label, markets.len());
        Ok(markets)
    }
}

/// Read a required string field of a catalog entry.
pub(crate) fn required_str<'a>(entry: &'a Value, key: &str) -> Result<&'a str, String> {
    entry.get(key).and_then(Value::as_str).ok_or_else(|| format!("entry without `{key}`"))
}

/// Read an optional string field of a catalog entry.
pub(crate) fn optional_string(entry: &Value, key: &str) -> Option<String> {
    entry.get(key).and_then(Value::as_str).map(str::to_string)
}
