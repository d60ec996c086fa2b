//! reqwest-backed transport with rate limiting
//!
//! Requests are paced by a governor rate limiter so a full font sync does not
//! hammer the origin. No retries happen here: a failed request is reported to
//! the caller and re-running the program is the retry mechanism.

use std::num::NonZeroU32;
use std::time::Duration;

use futures::{StreamExt, TryStreamExt};
use governor::{clock::DefaultClock, state::InMemoryState, Jitter, Quota, RateLimiter};
use reqwest::Client;
use url::Url;

use super::config::ClientConfig;
use super::{Transport, TransportResponse};
use crate::errors::{DownloadError, DownloadResult};

/// HTTP operations handler with rate limiting
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    rate_limiter: RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>,
}

impl HttpHandler {
    /// Creates a new HttpHandler with the given client and rate limiting
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::Configuration` if the rate limit is zero
    pub fn new(client: Client, rate_limit_rps: u32) -> DownloadResult<Self> {
        let rate_limiter = Self::build_rate_limiter(rate_limit_rps)?;
        Ok(Self {
            client,
            rate_limiter,
        })
    }

    /// Creates a handler from a client configuration
    pub fn from_config(config: &ClientConfig) -> DownloadResult<Self> {
        Self::new(config.build_http_client()?, config.rate_limit_rps)
    }

    /// Builds the rate limiter with the specified rate limit
    fn build_rate_limiter(
        rate_limit_rps: u32,
    ) -> DownloadResult<RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>> {
        let quota = Quota::per_second(NonZeroU32::new(rate_limit_rps).ok_or_else(|| {
            DownloadError::Configuration("Rate limit must be non-zero".to_string())
        })?);
        Ok(RateLimiter::direct(quota))
    }
}

/// Maps reqwest timeouts onto the dedicated error variant
fn classify(error: reqwest::Error, timeout: Duration) -> DownloadError {
    if error.is_timeout() {
        DownloadError::Timeout {
            seconds: timeout.as_secs(),
        }
    } else {
        DownloadError::Http(error)
    }
}

impl Transport for HttpHandler {
    async fn get(&self, url: &Url, timeout: Duration) -> DownloadResult<TransportResponse> {
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(50)))
            .await;

        let response = self
            .client
            .get(url.as_str())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        tracing::debug!("GET {} -> {}", url, response.status());

        let status = response.status().as_u16();
        let content_length = response.content_length();
        let body = response
            .bytes_stream()
            .map_err(move |e| classify(e, timeout))
            .boxed();

        Ok(TransportResponse {
            status,
            content_length,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiter_creation() {
        let rate_limiter = HttpHandler::build_rate_limiter(5).unwrap();
        rate_limiter.until_ready().await;
    }

    #[test]
    fn test_rate_limiter_zero_fails() {
        let result = HttpHandler::build_rate_limiter(0);
        assert!(matches!(result, Err(DownloadError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_http_handler_creation() {
        let config = ClientConfig::default();
        let handler = HttpHandler::from_config(&config);
        assert!(handler.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_an_error_not_a_panic() {
        let config = ClientConfig {
            connect_timeout: Duration::from_millis(200),
            ..Default::default()
        };
        let handler = HttpHandler::from_config(&config).unwrap();
        // Port 9 on localhost is "discard" and virtually never listening
        let url = Url::parse("http://127.0.0.1:9/index.html").unwrap();

        let result = handler.get(&url, Duration::from_millis(500)).await;
        assert!(result.is_err());
    }
}
