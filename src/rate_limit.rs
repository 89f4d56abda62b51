//! Token-bucket rate limiter shared by the HAL and Zotero clients.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Rate limiter that enforces a maximum request rate.
///
/// Uses a token-bucket algorithm. Also honours the `Backoff` and
/// `Retry-After` headers Zotero sends under load: the next request waits
/// until the server-requested pause is over. Nothing is ever re-sent.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<RateLimiterInner>>,
}

#[derive(Debug)]
struct RateLimiterInner {
    /// Maximum requests per second.
    max_per_second: f64,
    /// Time of the last request.
    last_request: Option<Instant>,
    /// No request may start before this instant.
    paused_until: Option<Instant>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given maximum requests per second.
    pub fn new(max_per_second: f64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RateLimiterInner {
                max_per_second,
                last_request: None,
                paused_until: None,
            })),
        }
    }

    /// Wait until a request is allowed, then mark it as sent.
    pub async fn acquire(&self) {
        let mut inner = self.inner.lock().await;

        // Server-requested pause first
        if let Some(until) = inner.paused_until {
            if Instant::now() < until {
                let wait = until - Instant::now();
                drop(inner);
                tokio::time::sleep(wait).await;
                inner = self.inner.lock().await;
            }
            inner.paused_until = None;
        }

        if let Some(last) = inner.last_request {
            let min_interval = Duration::from_secs_f64(1.0 / inner.max_per_second);
            let elapsed = last.elapsed();
            if elapsed < min_interval {
                let wait = min_interval - elapsed;
                drop(inner);
                tokio::time::sleep(wait).await;
                inner = self.inner.lock().await;
            }
        }

        inner.last_request = Some(Instant::now());
    }

    #[cfg(test)]
    pub(crate) fn is_shared_with(&self, other: &RateLimiter) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Update the limiter with headers from a response.
    pub async fn update_from_headers(&self, headers: &reqwest::header::HeaderMap) {
        let pause = ["backoff", "retry-after"]
            .iter()
            .filter_map(|name| {
                headers
                    .get(*name)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
            })
            .max();

        if let Some(secs) = pause {
            self.pause_for(Duration::from_secs(secs)).await;
        }
    }

    /// Hold every subsequent request for at least `wait`.
    pub async fn pause_for(&self, wait: Duration) {
        let mut inner = self.inner.lock().await;
        let until = Instant::now() + wait;
        if inner.paused_until.map_or(true, |current| current < until) {
            tracing::debug!(seconds = wait.as_secs_f64(), "Server requested backoff");
            inner.paused_until = Some(until);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    #[tokio::test]
    async fn test_rate_limiter_basic() {
        let limiter = RateLimiter::new(100.0); // 100/sec = 10ms interval
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;

        // 3 requests at 100/sec should take at least ~20ms
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(15));
    }

    #[tokio::test]
    async fn test_rate_limiter_first_request_immediate() {
        let limiter = RateLimiter::new(1.0);
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_header_delays_next_request() {
        let limiter = RateLimiter::new(1000.0);
        let mut headers = HeaderMap::new();
        headers.insert("Backoff", HeaderValue::from_static("2"));
        limiter.update_from_headers(&headers).await;

        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_unparseable_header_ignored() {
        let limiter = RateLimiter::new(1000.0);
        let mut headers = HeaderMap::new();
        headers.insert("Retry-After", HeaderValue::from_static("Wed, 21 Oct 2015"));
        limiter.update_from_headers(&headers).await;

        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn test_clones_share_state() {
        let limiter = RateLimiter::new(5.0);
        assert!(limiter.clone().is_shared_with(&limiter));
        assert!(!RateLimiter::new(5.0).is_shared_with(&limiter));
    }
}
