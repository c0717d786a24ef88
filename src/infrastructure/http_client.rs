//! HTTP client for the source site with rate limiting and fault classification
//!
//! Implements [`HttpFetcher`] on top of reqwest. Every request waits on a
//! governor rate limiter and races the cancellation token; failures are mapped
//! onto the pipeline's fault taxonomy so the retry executor can decide what to
//! repeat.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, direct::NotKeyed},
};
use reqwest::{
    Client, RequestBuilder, StatusCode,
    header::{HeaderMap, HeaderValue, REFERER, USER_AGENT},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::{HttpFetcher, ScrapeError, ScrapeResult};
use crate::infrastructure::config::{ScrapingConfig, hltb};

/// HTTP client configuration
#[derive(Debug, Clone, serde::Serialize)]
pub struct HttpClientConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_requests_per_second: u32,
    pub follow_redirects: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self::from(&ScrapingConfig::default())
    }
}

impl From<&ScrapingConfig> for HttpClientConfig {
    fn from(scraping: &ScrapingConfig) -> Self {
        Self {
            user_agent: scraping.user_agent.clone(),
            timeout_seconds: scraping.timeout_seconds,
            max_requests_per_second: scraping.max_requests_per_second,
            follow_redirects: true,
        }
    }
}

/// Rate-limited reqwest client
pub struct HttpClient {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    config: HttpClientConfig,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
        );
        // The search endpoint rejects requests without a same-site referer
        headers.insert(REFERER, HeaderValue::from_static(hltb::BASE_URL));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            })
            .build()
            .context("Failed to create HTTP client")?;

        let quota = Quota::per_second(
            NonZeroU32::new(config.max_requests_per_second)
                .context("Rate limit must be greater than 0")?,
        );
        let rate_limiter = RateLimiter::direct(quota);

        Ok(Self {
            client,
            rate_limiter,
            config,
        })
    }

    pub const fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Rate-limit, send and read the body, racing the token at every step
    async fn execute(
        &self,
        request: RequestBuilder,
        url: &str,
        cancellation_token: &CancellationToken,
    ) -> ScrapeResult<String> {
        if cancellation_token.is_cancelled() {
            return Err(ScrapeError::Cancelled);
        }

        tokio::select! {
            () = self.rate_limiter.until_ready() => {},
            () = cancellation_token.cancelled() => return Err(ScrapeError::Cancelled),
        }

        debug!("Fetching URL: {}", url);
        let response = tokio::select! {
            result = request.send() => result.map_err(|e| classify_reqwest_error(&e, url))?,
            () = cancellation_token.cancelled() => {
                warn!("🛑 HTTP request cancelled for URL: {}", url);
                return Err(ScrapeError::Cancelled);
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, url));
        }

        let body = tokio::select! {
            result = response.text() => result.map_err(|e| classify_reqwest_error(&e, url))?,
            () = cancellation_token.cancelled() => {
                warn!("🛑 Response reading cancelled for URL: {}", url);
                return Err(ScrapeError::Cancelled);
            }
        };

        debug!("Fetched: {} ({} chars)", url, body.len());
        Ok(body)
    }
}

#[async_trait]
impl HttpFetcher for HttpClient {
    async fn get(&self, url: &str, cancellation_token: &CancellationToken) -> ScrapeResult<String> {
        self.execute(self.client.get(url), url, cancellation_token).await
    }

    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
        cancellation_token: &CancellationToken,
    ) -> ScrapeResult<String> {
        self.execute(self.client.post(url).form(form), url, cancellation_token)
            .await
    }
}

/// 408, 429 and 5xx are worth retrying; every other failure status is final
fn classify_status(status: StatusCode, url: &str) -> ScrapeError {
    if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
    {
        ScrapeError::transient(format!("HTTP {status} from {url}"))
    } else {
        ScrapeError::Request {
            status: status.as_u16(),
            url: url.to_string(),
        }
    }
}

fn classify_reqwest_error(error: &reqwest::Error, url: &str) -> ScrapeError {
    if error.is_builder() {
        return ScrapeError::Request {
            status: 0,
            url: url.to_string(),
        };
    }
    if let Some(status) = error.status() {
        return classify_status(status, url);
    }
    ScrapeError::transient(format!("request to {url} failed: {error}"))
}
