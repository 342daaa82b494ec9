// SPDX-License-Identifier: GPL-3.0-or-later

//! Metadata sources behind the fetch gateway.
//!
//! A source turns user input into a request, downloads the document and
//! parses it. It decides which outcomes are failures; the gateway only runs
//! the lifecycle.

pub mod musicbrainz;
pub mod wikipedia;

pub use musicbrainz::MusicBrainzSource;
pub use wikipedia::WikipediaSource;

use async_trait::async_trait;
use thiserror::Error;
use tracksmith_domain::{AlbumMetadata, SourceType};

/// What a request's response body is expected to contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestIntent {
    /// An encyclopedia article.
    Page,
    Release,
    ReleaseGroup,
    Search,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRequest {
    pub url: String,
    pub intent: RequestIntent,
}

impl SourceRequest {
    pub fn new(url: impl Into<String>, intent: RequestIntent) -> Self {
        Self {
            url: url.into(),
            intent,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourcePayload {
    Album(AlbumMetadata),
    SearchResults(Vec<AlbumMetadata>),
}

/// Why a fetch failed. `Display` is the reason shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// Bad identifier, URL or search terms; no request was issued.
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Unsupported(String),

    #[error("{context}: {message}")]
    Transport { context: String, message: String },

    /// Undecodable response body.
    #[error("{0}")]
    Format(String),

    /// Parsed fine but contained nothing usable.
    #[error("{0}")]
    Empty(String),
}

impl SourceError {
    pub fn transport(context: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self::Transport {
            context: context.into(),
            message: error.to_string(),
        }
    }
}

pub type SourceResult<T> = Result<T, SourceError>;

/// A remote source of album metadata.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn source_type(&self) -> SourceType;

    fn supports_url_input(&self) -> bool;

    fn supports_search(&self) -> bool;

    fn is_valid_url(&self, input: &str) -> bool;

    /// Validate a URL or identifier and build the request for it.
    fn resolve_url(&self, input: &str) -> SourceResult<SourceRequest>;

    /// Validate search terms and build the search request.
    fn resolve_search(&self, artist: &str, album: &str) -> SourceResult<SourceRequest> {
        let _ = (artist, album);
        Err(SourceError::Unsupported(format!(
            "{} does not support search",
            self.name()
        )))
    }

    /// Download the response body.
    async fn fetch(&self, request: &SourceRequest) -> SourceResult<Vec<u8>>;

    /// Turn a response body into canonical metadata, or explain why it holds none.
    fn parse(&self, request: &SourceRequest, body: &[u8]) -> SourceResult<SourcePayload>;
}
