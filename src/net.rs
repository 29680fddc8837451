//! Page fetching for the crawler.
//!
//! The crawler only needs "give me the body behind this URL"; [`Fetcher`]
//! is that seam. [`HttpFetcher`] is the real implementation, adding a request
//! timeout and a client-side rate limit so the site is not hammered.

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::trace;
use url::Url;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!(
    "umcs-schedule/",
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_COMMIT_SHORT"),
    ")"
);

/// A successfully fetched page.
#[derive(Debug, Clone)]
pub struct Page {
    /// Final URL after redirects.
    pub url: Url,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed with status {status}")]
    Status { status: u16, url: String },
    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

/// Source of pages for the crawler.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Page, FetchError>;
}

/// Rate-limited HTTP client.
pub struct HttpFetcher {
    http: reqwest::Client,
    limiter: DefaultDirectRateLimiter,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, requests_per_second: NonZeroU32) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            limiter: RateLimiter::direct(Quota::per_second(requests_per_second)),
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Page, FetchError> {
        self.limiter.until_ready().await;
        trace!(url = url.as_str(), "GET");

        let resp = self.http.get(url.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let final_url = resp.url().clone();
        let body = resp.text().await?;
        Ok(Page {
            url: final_url,
            body,
        })
    }
}
