// SPDX-License-Identifier: GPL-3.0-or-later

use thiserror::Error;

pub type Result<T> = std::result::Result<T, WikipediaError>;

#[derive(Debug, Error)]
pub enum WikipediaError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Invalid Wikipedia URL: {0}")]
    InvalidUrl(String),

    #[error("Page not found: {0}")]
    NotFound(String),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Rate limiter closed")]
    RateLimiterClosed,
}
