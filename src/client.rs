//! The Zotero Web API client.

use crate::config::{Config, LibraryRef};
use crate::error::{Error, Result};
use crate::rate_limit::RateLimiter;
use reqwest::{Client, Method, RequestBuilder, Response};
use std::time::Duration;

pub(crate) const USER_AGENT: &str = concat!("dlab-biblio/", env!("CARGO_PKG_VERSION"));

/// Async client for one Zotero library.
///
/// Clones share one rate limiter, so pacing and server-requested backoff
/// apply to every clone talking to the same service.
///
/// # Example
///
/// ```no_run
/// # async fn example() -> dlab_biblio::error::Result<()> {
/// use dlab_biblio::{Config, ZoteroClient};
///
/// let client = ZoteroClient::new(&Config::from_env()?)?;
/// let item = client.fetch_item("ABCD2345").await?;
/// println!("{} at version {:?}", item.key, item.version);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ZoteroClient {
    pub(crate) http: Client,
    pub(crate) api_key: String,
    pub(crate) base_url: String,
    pub(crate) library: LibraryRef,
    pub(crate) collection: Option<String>,
    pub(crate) rate_limiter: RateLimiter,
}

impl ZoteroClient {
    /// Create a client for the library named in `config`.
    pub fn new(config: &Config) -> Result<Self> {
        let http = build_http(config.timeout)?;
        Ok(Self {
            http,
            api_key: config.zotero_api_key.clone(),
            base_url: config.zotero_base_url.trim_end_matches('/').to_string(),
            library: config.library.clone(),
            collection: config.collection.clone(),
            rate_limiter: RateLimiter::new(config.requests_per_second),
        })
    }

    /// Library-scoped URL for `path`.
    pub(crate) fn library_url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.library.path_prefix(), path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.library_url(path))
            .header("Zotero-API-Key", &self.api_key)
            .header("Zotero-API-Version", "3")
            .header("User-Agent", USER_AGENT)
    }

    /// Pace, send, and feed response headers back to the limiter.
    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        self.rate_limiter.acquire().await;
        let response = builder.send().await?;
        self.rate_limiter
            .update_from_headers(response.headers())
            .await;
        Ok(response)
    }

    /// Make an authenticated GET request. The raw response is returned so
    /// callers can read version headers.
    pub(crate) async fn get(&self, path: &str) -> Result<Response> {
        self.send(self.request(Method::GET, path)).await
    }

    /// Make an authenticated POST request with a JSON body.
    pub(crate) async fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<String> {
        let response = self
            .send(self.request(Method::POST, path).json(body))
            .await?;
        handle_response(response).await
    }

    /// Make an authenticated PUT request conditioned on `version`.
    pub(crate) async fn put_json_if_version(
        &self,
        path: &str,
        body: &serde_json::Value,
        version: u64,
    ) -> Result<Response> {
        let builder = self
            .request(Method::PUT, path)
            .header("If-Unmodified-Since-Version", version.to_string())
            .json(body);
        self.send(builder).await
    }
}

pub(crate) fn build_http(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Handle the HTTP response, mapping status codes to errors.
///
/// A 404 stays an `Upstream` error carrying its status; only single-item
/// reads turn it into [`Error::NotFound`].
pub(crate) async fn handle_response(response: Response) -> Result<String> {
    let status = response.status().as_u16();

    match status {
        200..=299 => Ok(response.text().await?),
        429 => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            Err(Error::RateLimited { retry_after })
        }
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(Error::Upstream {
                status,
                message: body,
            })
        }
    }
}

/// Read `Last-Modified-Version` from a Zotero response.
pub(crate) fn version_header(response: &Response) -> Option<u64> {
    response
        .headers()
        .get("last-modified-version")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}
