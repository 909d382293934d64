//! Remote tab page retrieval.

use std::fmt;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::Config;
use crate::error::{FetchError, FetchResult};
use crate::resilience::RateLimiter;

/// Anything that can produce the raw markup of a tab page.
#[async_trait]
pub trait DocumentSource: Send + Sync + fmt::Debug {
    /// Fetch the document at a fully-qualified `url`.
    async fn fetch(&self, url: &str) -> FetchResult<String>;
}

/// Fetches tab pages over HTTP.
///
/// Each call issues exactly one GET. Transport failures, timeouts and
/// non-2xx responses all surface as [`FetchError`].
#[derive(Debug, Clone)]
pub struct RemoteDocumentFetcher {
    http: Client,
    rate_limiter: RateLimiter,
}

impl RemoteDocumentFetcher {
    /// Build a fetcher with the configured timeout, user agent and rate.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &Config) -> FetchResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            http,
            rate_limiter: RateLimiter::new(config.requests_per_second),
        })
    }
}

#[async_trait]
impl DocumentSource for RemoteDocumentFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<String> {
        self.rate_limiter.acquire().await;
        log::debug!("GET {url}");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, &e))?
            .error_for_status()
            .map_err(|e| FetchError::from_reqwest(url, &e))?;

        response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, &e))
    }
}
