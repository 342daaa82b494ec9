// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::{Result, WikipediaError};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, instrument, trace};
use url::Url;

const USER_AGENT: &str = concat!(
    "Tracksmith/",
    env!("CARGO_PKG_VERSION"),
    " ( https://github.com/tracksmith/tracksmith )"
);

/// True for `https://<lang>.wikipedia.org/wiki/<Article>` style URLs.
pub fn is_article_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return false;
    };

    let host_ok = parsed
        .host_str()
        .map(|host| host.to_lowercase().ends_with("wikipedia.org"))
        .unwrap_or(false);

    host_ok && parsed.path().starts_with("/wiki/")
}

/// Fetches Wikipedia article HTML.
#[derive(Debug, Clone)]
pub struct WikipediaClient {
    client: Client,
    /// Replaces scheme and host of article URLs when set (mock servers, mirrors).
    base_url: Option<String>,
    rate_limiter: Arc<Semaphore>,
}

impl WikipediaClient {
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> WikipediaClientBuilder {
        WikipediaClientBuilder::default()
    }

    /// URL actually requested for an article URL.
    pub fn request_url(&self, article_url: &str) -> Result<String> {
        if !is_article_url(article_url) {
            return Err(WikipediaError::InvalidUrl(article_url.to_string()));
        }

        let parsed = Url::parse(article_url.trim())
            .map_err(|e| WikipediaError::InvalidUrl(e.to_string()))?;

        Ok(match &self.base_url {
            Some(base) => {
                let mut url = format!("{}{}", base, parsed.path());
                if let Some(query) = parsed.query() {
                    url.push('?');
                    url.push_str(query);
                }
                url
            }
            None => parsed.to_string(),
        })
    }

    /// Download the raw HTML of an article.
    #[instrument(skip(self))]
    pub async fn fetch_page(&self, article_url: &str) -> Result<Vec<u8>> {
        let url = self.request_url(article_url)?;

        let _permit = self
            .rate_limiter
            .acquire()
            .await
            .map_err(|_| WikipediaError::RateLimiterClosed)?;

        trace!(target: "wikipedia", "GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        debug!(target: "wikipedia", "response status: {}", status);

        if status == 404 {
            return Err(WikipediaError::NotFound(article_url.to_string()));
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(WikipediaError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        trace!(target: "wikipedia", bytes = body.len(), "response body received");
        Ok(body.to_vec())
    }
}

/// Builder for configuring a Wikipedia client.
#[derive(Debug)]
pub struct WikipediaClientBuilder {
    base_url: Option<String>,
    timeout: Duration,
    max_concurrent_requests: usize,
}

impl Default for WikipediaClientBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            max_concurrent_requests: 1,
        }
    }
}

impl WikipediaClientBuilder {
    /// Serve article paths from another host (useful for testing with mock servers).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_concurrent_requests(mut self, max: usize) -> Self {
        self.max_concurrent_requests = max;
        self
    }

    pub fn build(self) -> Result<WikipediaClient> {
        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(WikipediaClient {
            client,
            base_url: self.base_url,
            rate_limiter: Arc::new(Semaphore::new(self.max_concurrent_requests.max(1))),
        })
    }
}
