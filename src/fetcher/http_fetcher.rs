use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::Client;
use url::Url;

use crate::app::Result;
use crate::fetcher::Fetcher;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Query parameter carrying the cache-busting timestamp.
const CACHE_BUST_PARAM: &str = "_t";

pub struct HttpFetcher {
    client: Client,
    cache_bust: bool,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, cache_bust: bool) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("feedwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, cache_bust })
    }

    /// Append `_t=<unix millis>` so intermediaries never serve a stale copy.
    pub fn cache_busted_url(url: &str, millis: i64) -> Result<Url> {
        let mut url = Url::parse(url)?;
        url.query_pairs_mut()
            .append_pair(CACHE_BUST_PARAM, &millis.to_string());
        Ok(url)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let target = if self.cache_bust {
            Self::cache_busted_url(url, Utc::now().timestamp_millis())?
        } else {
            Url::parse(url)?
        };

        tracing::debug!("Fetching {}", target);

        let response = self
            .client
            .get(target)
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .send()
            .await?;

        response.error_for_status_ref()?;

        let body = response.bytes().await?.to_vec();
        tracing::debug!("Fetched {} bytes", body.len());

        Ok(body)
    }
}
