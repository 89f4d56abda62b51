//! HAL lookup by identifier.

use crate::client::{build_http, handle_response, USER_AGENT};
use crate::config::Config;
use crate::error::Result;
use crate::parse::{parse_lookup_response, RawDocument, CATALOG_FIELDS};
use crate::rate_limit::RateLimiter;
use async_trait::async_trait;
use reqwest::Client;

/// Source of raw catalog documents.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Look one identifier up. `Ok(None)` means the catalog has no match.
    async fn fetch(&self, identifier: &str) -> Result<Option<RawDocument>>;
}

/// Async client for the HAL search API.
#[derive(Clone)]
pub struct HalClient {
    http: Client,
    base_url: String,
    rate_limiter: RateLimiter,
}

impl HalClient {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            http: build_http(config.timeout)?,
            base_url: config.catalog_base_url.clone(),
            rate_limiter: RateLimiter::new(config.requests_per_second),
        })
    }

    /// Query string selecting exactly one HAL identifier.
    pub fn identifier_query(identifier: &str) -> String {
        let escaped = identifier.replace('\\', "\\\\").replace('"', "\\\"");
        format!("halId_s:\"{}\"", escaped)
    }
}

#[async_trait]
impl CatalogSource for HalClient {
    async fn fetch(&self, identifier: &str) -> Result<Option<RawDocument>> {
        self.rate_limiter.acquire().await;

        let query = Self::identifier_query(identifier);
        let params = [
            ("q", query.as_str()),
            ("fl", CATALOG_FIELDS),
            ("rows", "1"),
            ("wt", "json"),
        ];

        tracing::debug!(identifier = %identifier, "Looking up HAL document");
        let response = self
            .http
            .get(&self.base_url)
            .header("User-Agent", USER_AGENT)
            .query(&params)
            .send()
            .await?;

        self.rate_limiter
            .update_from_headers(response.headers())
            .await;
        let body = handle_response(response).await?;
        parse_lookup_response(&body)
    }
}
