// SPDX-License-Identifier: GPL-3.0-or-later

use super::{MetadataSource, RequestIntent, SourceError, SourcePayload, SourceRequest, SourceResult};
use async_trait::async_trait;
use tracing::debug;
use tracksmith_config::WikipediaConfig;
use tracksmith_domain::SourceType;
use tracksmith_wikipedia::{is_article_url, parse_page, WikipediaClient};

pub struct WikipediaSource {
    client: WikipediaClient,
}

impl WikipediaSource {
    pub fn new(client: WikipediaClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &WikipediaConfig) -> tracksmith_wikipedia::Result<Self> {
        let mut builder = WikipediaClient::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .max_concurrent_requests(config.max_concurrent_requests);
        if let Some(base_url) = &config.base_url {
            builder = builder.base_url(base_url.clone());
        }
        Ok(Self::new(builder.build()?))
    }
}

#[async_trait]
impl MetadataSource for WikipediaSource {
    fn name(&self) -> &'static str {
        "Wikipedia"
    }

    fn source_type(&self) -> SourceType {
        SourceType::Wikipedia
    }

    fn supports_url_input(&self) -> bool {
        true
    }

    fn supports_search(&self) -> bool {
        false
    }

    fn is_valid_url(&self, input: &str) -> bool {
        is_article_url(input)
    }

    fn resolve_url(&self, input: &str) -> SourceResult<SourceRequest> {
        if !is_article_url(input) {
            return Err(SourceError::InvalidInput("Invalid Wikipedia URL".to_string()));
        }
        Ok(SourceRequest::new(input.trim(), RequestIntent::Page))
    }

    fn resolve_search(&self, _artist: &str, _album: &str) -> SourceResult<SourceRequest> {
        Err(SourceError::Unsupported(
            "Wikipedia does not support search. Please provide a URL.".to_string(),
        ))
    }

    async fn fetch(&self, request: &SourceRequest) -> SourceResult<Vec<u8>> {
        self.client
            .fetch_page(&request.url)
            .await
            .map_err(|e| SourceError::transport("Network error", e))
    }

    fn parse(&self, request: &SourceRequest, body: &[u8]) -> SourceResult<SourcePayload> {
        if body.is_empty() {
            return Err(SourceError::Empty("Empty response from Wikipedia".to_string()));
        }

        let album = parse_page(body, &request.url);
        if !album.has_tracks() {
            debug!(target: "gateway", url = %request.url, "page has no track listing");
            return Err(SourceError::Empty(
                "No soundtrack table found on the page".to_string(),
            ));
        }

        Ok(SourcePayload::Album(album))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> WikipediaSource {
        WikipediaSource::new(WikipediaClient::new().unwrap())
    }

    #[test]
    fn capabilities() {
        let source = source();
        assert_eq!(source.name(), "Wikipedia");
        assert_eq!(source.source_type(), SourceType::Wikipedia);
        assert!(source.supports_url_input());
        assert!(!source.supports_search());
        assert!(source.is_valid_url("https://en.wikipedia.org/wiki/Roja_(film)"));
        assert!(!source.is_valid_url("https://musicbrainz.org/release/x"));
    }

    #[test]
    fn rejects_invalid_urls() {
        assert_eq!(
            source().resolve_url("https://example.com/wiki/Roja"),
            Err(SourceError::InvalidInput("Invalid Wikipedia URL".to_string()))
        );
    }

    #[test]
    fn search_is_unsupported() {
        let error = source().resolve_search("Ilaiyaraaja", "Annakili").unwrap_err();
        assert_eq!(
            error.to_string(),
            "Wikipedia does not support search. Please provide a URL."
        );
    }

    #[test]
    fn empty_and_trackless_pages_fail() {
        let source = source();
        let request = source
            .resolve_url("https://en.wikipedia.org/wiki/Nothing")
            .unwrap();

        assert_eq!(
            source.parse(&request, b""),
            Err(SourceError::Empty("Empty response from Wikipedia".to_string()))
        );
        assert_eq!(
            source.parse(&request, b"<title>Nothing - Wikipedia</title>"),
            Err(SourceError::Empty(
                "No soundtrack table found on the page".to_string()
            ))
        );
    }
}
