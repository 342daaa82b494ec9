// SPDX-License-Identifier: GPL-3.0-or-later

//! MusicBrainz client and extractor.
//!
//! Fetches releases, release groups and release search results from the
//! MusicBrainz web service with built-in rate limiting, and converts the JSON
//! documents into canonical album metadata.

pub mod client;
pub mod error;
pub mod extract;
pub mod ids;
pub mod models;
pub mod rate_limiter;

pub use client::{MusicBrainzClient, MusicBrainzClientBuilder};
pub use error::{MusicBrainzError, Result};
pub use extract::{
    parse_release, parse_release_group, parse_search_results, release_group_page_url,
    release_page_url, year_from_date,
};
pub use ids::{build_search_query, parse_reference, MbEntity, MbReference};
pub use rate_limiter::RateLimiter;
