// SPDX-License-Identifier: GPL-3.0-or-later

//! Lenient views of the MusicBrainz JSON documents.
//!
//! Every field defaults so that a missing key reads as empty instead of
//! failing the whole document. Fields are also read one at a time: a value of
//! the wrong type reads as empty without discarding its siblings.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Field value, or its default when the JSON value has the wrong type.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// Number that may also arrive as a numeric string (`"3"`).
fn lenient_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + FromStr,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text.trim().parse().ok(),
        other => T::deserialize(other).ok(),
    })
}

/// Array elements that read as `T`; anything that is not an array is empty.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| T::deserialize(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// Artist credit entry (artist contribution to a release or track).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ArtistCredit {
    /// Name as credited on the release.
    #[serde(deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub artist: ArtistRef,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ArtistRef {
    #[serde(deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub name: Option<String>,
}

/// Comma-joined artist names, in credit order.
pub fn credited_names(credits: &[ArtistCredit]) -> String {
    credits
        .iter()
        .map(|credit| credit.artist.name.as_deref().unwrap_or_default())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Recording {
    #[serde(deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(rename = "artist-credit", deserialize_with = "lenient_list")]
    pub artist_credit: Vec<ArtistCredit>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Track {
    #[serde(deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    pub position: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    pub title: Option<String>,
    /// Length in milliseconds.
    #[serde(deserialize_with = "lenient_number")]
    pub length: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub recording: Recording,
    #[serde(rename = "artist-credit", deserialize_with = "lenient_list")]
    pub artist_credit: Vec<ArtistCredit>,
}

/// One disc of a release.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Medium {
    #[serde(deserialize_with = "lenient_number")]
    pub position: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    pub format: Option<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Release {
    #[serde(deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub country: Option<String>,
    /// Release date (YYYY, YYYY-MM, or YYYY-MM-DD).
    #[serde(deserialize_with = "lenient")]
    pub date: Option<String>,
    #[serde(rename = "artist-credit", deserialize_with = "lenient_list")]
    pub artist_credit: Vec<ArtistCredit>,
    #[serde(deserialize_with = "lenient_list")]
    pub media: Vec<Medium>,
}

impl Release {
    /// True when at least one medium carries at least one track.
    pub fn has_tracks(&self) -> bool {
        self.media.iter().any(|medium| !medium.tracks.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReleaseGroup {
    #[serde(deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(rename = "first-release-date", deserialize_with = "lenient")]
    pub first_release_date: Option<String>,
    #[serde(rename = "artist-credit", deserialize_with = "lenient_list")]
    pub artist_credit: Vec<ArtistCredit>,
    #[serde(deserialize_with = "lenient_list")]
    pub releases: Vec<Release>,
}

/// Response of `GET /release?query=...`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReleaseSearchResponse {
    #[serde(deserialize_with = "lenient_number")]
    pub count: Option<u32>,
    #[serde(deserialize_with = "lenient_number")]
    pub offset: Option<u32>,
    #[serde(deserialize_with = "lenient_list")]
    pub releases: Vec<Release>,
}
