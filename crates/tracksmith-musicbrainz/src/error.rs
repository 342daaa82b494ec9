// SPDX-License-Identifier: GPL-3.0-or-later

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MusicBrainzError>;

/// Failures talking to the MusicBrainz web service.
///
/// Extraction never produces these; a document of the wrong shape yields an
/// empty album instead.
#[derive(Debug, Error)]
pub enum MusicBrainzError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// HTTP 503, which MusicBrainz returns when a client exceeds its rate.
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
}
