//! Service endpoints, credentials and pipeline tuning.
//!
//! The core never reads process state on its own; callers build a [`Config`]
//! (usually through [`Config::from_env`]) and hand it to the clients.

use crate::error::{Error, Result};
use std::time::Duration;
use url::Url;

/// Default HAL search endpoint.
pub const DEFAULT_CATALOG_URL: &str = "https://api.archives-ouvertes.fr/search/";

/// Default Zotero Web API endpoint.
pub const DEFAULT_ZOTERO_URL: &str = "https://api.zotero.org";

/// Items per Zotero create request.
pub const DEFAULT_BATCH_SIZE: usize = 25;

/// Zotero refuses create requests with more than this many items.
pub const MAX_BATCH_SIZE: usize = 50;

/// Owner kind of a Zotero library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryKind {
    User,
    Group,
}

impl LibraryKind {
    /// Parse from string (case-insensitive).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "user" | "users" => Some(Self::User),
            "group" | "groups" => Some(Self::Group),
            _ => None,
        }
    }
}

/// A Zotero library: user or group plus its numeric id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryRef {
    pub kind: LibraryKind,
    pub id: String,
}

impl LibraryRef {
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            kind: LibraryKind::User,
            id: id.into(),
        }
    }

    pub fn group(id: impl Into<String>) -> Self {
        Self {
            kind: LibraryKind::Group,
            id: id.into(),
        }
    }

    /// URL path prefix, e.g. `/groups/12345`.
    pub fn path_prefix(&self) -> String {
        match self.kind {
            LibraryKind::User => format!("/users/{}", self.id),
            LibraryKind::Group => format!("/groups/{}", self.id),
        }
    }
}

/// Everything the clients and the pipeline need to run.
#[derive(Debug, Clone)]
pub struct Config {
    pub catalog_base_url: String,
    pub zotero_base_url: String,
    pub zotero_api_key: String,
    pub library: LibraryRef,
    /// Collection every imported item is filed in, if any.
    pub collection: Option<String>,
    /// Concurrent HAL lookups during an import.
    pub fetch_concurrency: usize,
    pub batch_size: usize,
    pub requests_per_second: f64,
    pub timeout: Duration,
}

impl Config {
    /// Create a config for the given library with default endpoints.
    pub fn new(api_key: impl Into<String>, library: LibraryRef) -> Self {
        Self {
            catalog_base_url: DEFAULT_CATALOG_URL.to_string(),
            zotero_base_url: DEFAULT_ZOTERO_URL.to_string(),
            zotero_api_key: api_key.into(),
            library,
            collection: None,
            fetch_concurrency: 4,
            batch_size: DEFAULT_BATCH_SIZE,
            requests_per_second: 5.0,
            timeout: Duration::from_secs(30),
        }
    }

    /// Build a config from `ZOTERO_API_KEY`, `ZOTERO_LIBRARY_ID` and friends.
    ///
    /// `ZOTERO_LIBRARY_TYPE` defaults to `group`. `HAL_API_URL`,
    /// `ZOTERO_API_URL` and `ZOTERO_COLLECTION` are optional.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Config::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = non_empty("ZOTERO_API_KEY")
            .ok_or_else(|| Error::Config("ZOTERO_API_KEY is not set".to_string()))?;
        let library_id = non_empty("ZOTERO_LIBRARY_ID")
            .ok_or_else(|| Error::Config("ZOTERO_LIBRARY_ID is not set".to_string()))?;
        let kind = match non_empty("ZOTERO_LIBRARY_TYPE") {
            Some(raw) => LibraryKind::from_str_loose(&raw).ok_or_else(|| {
                Error::Config(format!(
                    "ZOTERO_LIBRARY_TYPE must be 'user' or 'group', got '{}'",
                    raw
                ))
            })?,
            None => LibraryKind::Group,
        };

        let mut config = Self::new(
            api_key,
            LibraryRef {
                kind,
                id: library_id.trim().to_string(),
            },
        );
        if let Some(url) = non_empty("HAL_API_URL") {
            config = config.with_catalog_url(url);
        }
        if let Some(url) = non_empty("ZOTERO_API_URL") {
            config = config.with_zotero_url(url);
        }
        if let Some(collection) = non_empty("ZOTERO_COLLECTION") {
            config = config.with_collection(collection.trim());
        }
        config.validate()?;
        Ok(config)
    }

    /// Override the HAL endpoint (useful for testing).
    pub fn with_catalog_url(mut self, url: impl Into<String>) -> Self {
        self.catalog_base_url = url.into();
        self
    }

    /// Override the Zotero endpoint (useful for testing).
    pub fn with_zotero_url(mut self, url: impl Into<String>) -> Self {
        self.zotero_base_url = url.into();
        self
    }

    pub fn with_collection(mut self, key: impl Into<String>) -> Self {
        self.collection = Some(key.into());
        self
    }

    pub fn with_fetch_concurrency(mut self, n: usize) -> Self {
        self.fetch_concurrency = n.max(1);
        self
    }

    /// Override the create-request size, clamped to what Zotero accepts.
    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n.clamp(1, MAX_BATCH_SIZE);
        self
    }

    /// Override the rate limit (requests per second).
    pub fn with_rate_limit(mut self, per_second: f64) -> Self {
        self.requests_per_second = per_second;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check that credentials are present and both endpoints are URLs.
    pub fn validate(&self) -> Result<()> {
        if self.zotero_api_key.trim().is_empty() {
            return Err(Error::Config("Zotero API key is empty".to_string()));
        }
        if self.library.id.is_empty() || !self.library.id.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::Config(format!(
                "Zotero library id must be numeric, got '{}'",
                self.library.id
            )));
        }
        for (name, raw) in [
            ("HAL", &self.catalog_base_url),
            ("Zotero", &self.zotero_base_url),
        ] {
            let parsed = Url::parse(raw)
                .map_err(|e| Error::Config(format!("Invalid {} URL '{}': {}", name, raw, e)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(Error::Config(format!(
                    "{} URL must be http(s), got '{}'",
                    name, raw
                )));
            }
        }
        if self.requests_per_second.is_nan() || self.requests_per_second <= 0.0 {
            return Err(Error::Config("requests_per_second must be positive".to_string()));
        }
        Ok(())
    }
}
