// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::{MusicBrainzError, Result};
use crate::ids::{MbEntity, MbReference};
use crate::rate_limiter::RateLimiter;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;
use uuid::Uuid;

const MUSICBRAINZ_API_BASE: &str = "https://musicbrainz.org/ws/2";
const RELEASE_INCLUDES: &str = "recordings+artist-credits+labels+release-groups";
const RELEASE_GROUP_INCLUDES: &str = "releases+recordings+artist-credits+labels";
const DEFAULT_SEARCH_LIMIT: u32 = 25;
const USER_AGENT: &str = concat!(
    "Tracksmith/",
    env!("CARGO_PKG_VERSION"),
    " ( https://github.com/tracksmith/tracksmith )"
);

/// MusicBrainz web service client with rate limiting.
#[derive(Debug, Clone)]
pub struct MusicBrainzClient {
    client: Client,
    base_url: String,
    rate_limiter: RateLimiter,
    search_limit: u32,
}

impl MusicBrainzClient {
    /// Create a new MusicBrainz client with default settings.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a client builder for custom configuration.
    pub fn builder() -> MusicBrainzClientBuilder {
        MusicBrainzClientBuilder::default()
    }

    /// Lookup URL for a release, including recordings and artist credits.
    pub fn release_url(&self, mbid: &Uuid) -> String {
        format!(
            "{}/release/{}?fmt=json&inc={}",
            self.base_url, mbid, RELEASE_INCLUDES
        )
    }

    /// Lookup URL for a release group, including its releases and their recordings.
    pub fn release_group_url(&self, mbid: &Uuid) -> String {
        format!(
            "{}/release-group/{}?fmt=json&inc={}",
            self.base_url, mbid, RELEASE_GROUP_INCLUDES
        )
    }

    pub fn lookup_url(&self, reference: &MbReference) -> String {
        match reference.entity {
            MbEntity::Release => self.release_url(&reference.id),
            MbEntity::ReleaseGroup => self.release_group_url(&reference.id),
        }
    }

    /// Release search URL for an already built Lucene query.
    pub fn search_url(&self, query: &str) -> Result<String> {
        let mut url = Url::parse(&format!("{}/release", self.base_url))
            .map_err(|e| MusicBrainzError::InvalidUrl(e.to_string()))?;

        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("fmt", "json")
            .append_pair("limit", &self.search_limit.to_string());

        Ok(url.into())
    }

    /// Rate-limited GET returning the raw response body.
    ///
    /// Decoding is left to the caller, see [`crate::extract`].
    ///
    /// # Example
    /// ```no_run
    /// # use tracksmith_musicbrainz::{parse_reference, parse_release, MusicBrainzClient};
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = MusicBrainzClient::new()?;
    /// let reference = parse_reference("https://musicbrainz.org/release/6f1e0c0a-6d0b-4b61-a1a3-7f8d7c3b2a11")
    ///     .ok_or("not a MusicBrainz reference")?;
    /// let body = client.fetch_bytes(&client.lookup_url(&reference)).await?;
    /// let album = parse_release(&serde_json::from_slice(&body)?);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.rate_limiter.acquire().await;

        trace!(target: "musicbrainz", "GET {}", url);

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        debug!(target: "musicbrainz", "response status: {}", status);

        if status == 404 {
            return Err(MusicBrainzError::NotFound(url.to_string()));
        }

        if status == 503 {
            return Err(MusicBrainzError::RateLimitExceeded);
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(MusicBrainzError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        trace!(target: "musicbrainz", bytes = body.len(), "response body received");
        Ok(body.to_vec())
    }
}

impl Default for MusicBrainzClient {
    fn default() -> Self {
        // Fall back to a plain reqwest client if the configured one cannot be built.
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());

        MusicBrainzClient {
            client,
            base_url: MUSICBRAINZ_API_BASE.to_string(),
            rate_limiter: RateLimiter::musicbrainz_default(),
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

/// Builder for configuring a MusicBrainz client.
#[derive(Debug)]
pub struct MusicBrainzClientBuilder {
    base_url: String,
    timeout: Duration,
    rate_limit_interval: Duration,
    search_limit: u32,
}

impl Default for MusicBrainzClientBuilder {
    fn default() -> Self {
        Self {
            base_url: MUSICBRAINZ_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
            rate_limit_interval: Duration::from_secs(1),
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

impl MusicBrainzClientBuilder {
    /// Set a custom base URL (useful for testing with mock servers).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set request timeout duration.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set rate limit interval between requests.
    pub fn rate_limit_interval(mut self, interval: Duration) -> Self {
        self.rate_limit_interval = interval;
        self
    }

    /// Maximum number of releases returned by a search.
    pub fn search_limit(mut self, limit: u32) -> Self {
        self.search_limit = limit;
        self
    }

    /// Build the MusicBrainz client.
    pub fn build(self) -> Result<MusicBrainzClient> {
        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(MusicBrainzClient {
            client,
            base_url: self.base_url,
            rate_limiter: RateLimiter::new(self.rate_limit_interval),
            search_limit: self.search_limit,
        })
    }
}
