// SPDX-License-Identifier: GPL-3.0-or-later

use super::{MetadataSource, RequestIntent, SourceError, SourcePayload, SourceRequest, SourceResult};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracksmith_config::MusicBrainzConfig;
use tracksmith_domain::SourceType;
use tracksmith_musicbrainz::{
    build_search_query, parse_reference, parse_release, parse_release_group,
    parse_search_results, MbEntity, MusicBrainzClient,
};

pub struct MusicBrainzSource {
    client: MusicBrainzClient,
}

impl MusicBrainzSource {
    pub fn new(client: MusicBrainzClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &MusicBrainzConfig) -> tracksmith_musicbrainz::Result<Self> {
        let mut builder = MusicBrainzClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .rate_limit_interval(Duration::from_millis(config.rate_limit_ms))
            .search_limit(config.search_limit);
        if let Some(base_url) = &config.base_url {
            builder = builder.base_url(base_url.clone());
        }
        Ok(Self::new(builder.build()?))
    }
}

fn failure_context(intent: RequestIntent) -> &'static str {
    match intent {
        RequestIntent::Search => "Search failed",
        RequestIntent::Release => "Failed to fetch release",
        RequestIntent::ReleaseGroup => "Failed to fetch release group",
        RequestIntent::Page => "Network error",
    }
}

#[async_trait]
impl MetadataSource for MusicBrainzSource {
    fn name(&self) -> &'static str {
        "MusicBrainz"
    }

    fn source_type(&self) -> SourceType {
        SourceType::MusicBrainz
    }

    fn supports_url_input(&self) -> bool {
        true
    }

    fn supports_search(&self) -> bool {
        true
    }

    fn is_valid_url(&self, input: &str) -> bool {
        parse_reference(input).is_some()
    }

    fn resolve_url(&self, input: &str) -> SourceResult<SourceRequest> {
        let reference = parse_reference(input)
            .ok_or_else(|| SourceError::InvalidInput("Invalid MusicBrainz URL or ID".to_string()))?;

        let intent = match reference.entity {
            MbEntity::Release => RequestIntent::Release,
            MbEntity::ReleaseGroup => RequestIntent::ReleaseGroup,
        };
        Ok(SourceRequest::new(self.client.lookup_url(&reference), intent))
    }

    fn resolve_search(&self, artist: &str, album: &str) -> SourceResult<SourceRequest> {
        let query = build_search_query(artist, album).ok_or_else(|| {
            SourceError::InvalidInput("Please provide artist and/or album name".to_string())
        })?;

        let url = self
            .client
            .search_url(&query)
            .map_err(|e| SourceError::InvalidInput(e.to_string()))?;
        Ok(SourceRequest::new(url, RequestIntent::Search))
    }

    async fn fetch(&self, request: &SourceRequest) -> SourceResult<Vec<u8>> {
        self.client
            .fetch_bytes(&request.url)
            .await
            .map_err(|e| SourceError::transport(failure_context(request.intent), e))
    }

    fn parse(&self, request: &SourceRequest, body: &[u8]) -> SourceResult<SourcePayload> {
        let what = match request.intent {
            RequestIntent::Search => "search results",
            RequestIntent::Release => "release data",
            RequestIntent::ReleaseGroup => "release group data",
            RequestIntent::Page => {
                return Err(SourceError::Unsupported(
                    "MusicBrainz does not serve article pages".to_string(),
                ))
            }
        };

        let document: Value = serde_json::from_slice(body)
            .map_err(|e| SourceError::Format(format!("Failed to parse {what}: {e}")))?;

        match request.intent {
            RequestIntent::Search => {
                let albums = parse_search_results(&document);
                if albums.is_empty() {
                    return Err(SourceError::Empty("No releases found".to_string()));
                }
                Ok(SourcePayload::SearchResults(albums))
            }
            RequestIntent::ReleaseGroup => {
                let album = parse_release_group(&document);
                if !album.has_tracks() {
                    return Err(SourceError::Empty("Release group has no tracks".to_string()));
                }
                Ok(SourcePayload::Album(album))
            }
            _ => {
                let album = parse_release(&document);
                if !album.has_tracks() {
                    return Err(SourceError::Empty("Release has no tracks".to_string()));
                }
                Ok(SourcePayload::Album(album))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const MBID: &str = "b1392450-e666-3926-a536-22c65f834433";

    fn source() -> MusicBrainzSource {
        MusicBrainzSource::new(
            MusicBrainzClient::builder()
                .base_url("http://mb.local/ws/2")
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn resolves_release_group_urls() {
        let request = source()
            .resolve_url(&format!("https://musicbrainz.org/release-group/{MBID}"))
            .unwrap();
        assert_eq!(request.intent, RequestIntent::ReleaseGroup);
        assert!(request
            .url
            .starts_with(&format!("http://mb.local/ws/2/release-group/{MBID}?")));
    }

    #[test]
    fn bare_ids_resolve_to_releases() {
        let request = source().resolve_url(MBID).unwrap();
        assert_eq!(request.intent, RequestIntent::Release);
    }

    #[test]
    fn invalid_input_is_rejected_before_any_request() {
        let source = source();
        assert_eq!(
            source.resolve_url("Annakili").unwrap_err().to_string(),
            "Invalid MusicBrainz URL or ID"
        );
        assert_eq!(
            source.resolve_search("", "  ").unwrap_err().to_string(),
            "Please provide artist and/or album name"
        );
    }

    #[test]
    fn search_request_targets_release_endpoint() {
        let request = source().resolve_search("Ilaiyaraaja", "").unwrap();
        assert_eq!(request.intent, RequestIntent::Search);
        assert!(request.url.starts_with("http://mb.local/ws/2/release?query="));
    }

    #[test]
    fn parse_reports_format_and_empty_failures() {
        let source = source();
        let release = SourceRequest::new("u", RequestIntent::Release);
        let group = SourceRequest::new("u", RequestIntent::ReleaseGroup);
        let search = SourceRequest::new("u", RequestIntent::Search);

        match source.parse(&release, b"{oops") {
            Err(SourceError::Format(message)) => {
                assert!(message.starts_with("Failed to parse release data: "))
            }
            other => panic!("expected format error, got: {other:?}"),
        }
        assert_eq!(
            source.parse(&release, br#"{"title": "x", "media": []}"#),
            Err(SourceError::Empty("Release has no tracks".to_string()))
        );
        assert_eq!(
            source.parse(&group, br#"{"releases": []}"#),
            Err(SourceError::Empty("Release group has no tracks".to_string()))
        );
        assert_eq!(
            source.parse(&search, br#"{"count": 0, "releases": []}"#),
            Err(SourceError::Empty("No releases found".to_string()))
        );
    }

    #[test]
    fn parse_release_payload() {
        let body = serde_json::to_vec(&json!({
            "id": MBID,
            "title": "Annakili",
            "media": [{"tracks": [{"position": 1, "title": "Annakili Unna Theduthe", "length": 272000}]}]
        }))
        .unwrap();

        let request = SourceRequest::new("u", RequestIntent::Release);
        match source().parse(&request, &body) {
            Ok(SourcePayload::Album(album)) => {
                assert_eq!(album.album, "Annakili");
                assert_eq!(album.tracks.len(), 1);
                assert_eq!(album.tracks[0].duration_seconds, 272);
            }
            other => panic!("expected album, got: {other:?}"),
        }
    }

    #[test]
    fn transport_context_follows_intent() {
        assert_eq!(failure_context(RequestIntent::Search), "Search failed");
        assert_eq!(
            failure_context(RequestIntent::ReleaseGroup),
            "Failed to fetch release group"
        );
    }
}
