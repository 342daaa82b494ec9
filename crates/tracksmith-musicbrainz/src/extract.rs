// SPDX-License-Identifier: GPL-3.0-or-later

//! Conversion of MusicBrainz JSON documents into canonical album metadata.
//!
//! All functions are total. A document of the wrong shape yields an empty
//! result; deciding whether that is a failure is up to the caller.

use crate::models::{credited_names, Release, ReleaseGroup, ReleaseSearchResponse};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use tracksmith_domain::{AlbumMetadata, SourceType, TrackMetadata};

const RELEASE_PAGE_BASE: &str = "https://musicbrainz.org/release";
const RELEASE_GROUP_PAGE_BASE: &str = "https://musicbrainz.org/release-group";

/// Public web page of a release.
pub fn release_page_url(release_id: &str) -> String {
    format!("{}/{}", RELEASE_PAGE_BASE, release_id)
}

/// Public web page of a release group.
pub fn release_group_page_url(release_group_id: &str) -> String {
    format!("{}/{}", RELEASE_GROUP_PAGE_BASE, release_group_id)
}

/// Year from the first four characters of a MusicBrainz date, or 0 when they
/// are not all ASCII digits.
pub fn year_from_date(date: &str) -> u32 {
    match date.get(..4) {
        Some(prefix) if prefix.bytes().all(|b| b.is_ascii_digit()) => {
            prefix.parse().unwrap_or(0)
        }
        _ => 0,
    }
}

fn read_lenient<T: DeserializeOwned + Default>(document: &Value, shape: &str) -> T {
    T::deserialize(document).unwrap_or_else(|e| {
        debug!(target: "musicbrainz", %e, shape, "document does not match expected shape");
        T::default()
    })
}

/// Albums (without tracks) from a release search response.
pub fn parse_search_results(document: &Value) -> Vec<AlbumMetadata> {
    let response: ReleaseSearchResponse = read_lenient(document, "search results");

    let albums: Vec<AlbumMetadata> = response.releases.iter().map(album_from_release).collect();

    debug!(target: "musicbrainz", releases = albums.len(), "parsed search results");
    albums
}

/// Album with one track per medium track, in disc then track order.
pub fn parse_release(document: &Value) -> AlbumMetadata {
    let release: Release = read_lenient(document, "release");

    let mut album = album_from_release(&release);
    album.tracks = build_tracks(&release, &album);

    debug!(
        target: "musicbrainz",
        album = %album.album,
        album_artist = %album.album_artist,
        tracks = album.tracks.len(),
        "parsed release"
    );
    album
}

/// Album from a release group, with tracks from its first release that has any.
pub fn parse_release_group(document: &Value) -> AlbumMetadata {
    let group: ReleaseGroup = read_lenient(document, "release group");

    let release_id = group.id.clone().unwrap_or_default();
    let mut album = AlbumMetadata::new(SourceType::MusicBrainz, release_group_page_url(&release_id));
    album.release_id = release_id;
    album.album = group.title.clone().unwrap_or_default();
    album.album_artist = credited_names(&group.artist_credit);
    album.year = group
        .first_release_date
        .as_deref()
        .map(year_from_date)
        .unwrap_or(0);

    if let Some(release) = group.releases.iter().find(|release| release.has_tracks()) {
        album.tracks = build_tracks(release, &album);
    }

    debug!(
        target: "musicbrainz",
        album = %album.album,
        album_artist = %album.album_artist,
        tracks = album.tracks.len(),
        "parsed release group"
    );
    album
}

fn album_from_release(release: &Release) -> AlbumMetadata {
    let release_id = release.id.clone().unwrap_or_default();

    let mut album = AlbumMetadata::new(SourceType::MusicBrainz, release_page_url(&release_id));
    album.release_id = release_id;
    album.album = release.title.clone().unwrap_or_default();
    album.country = release.country.clone().unwrap_or_default();
    album.year = release.date.as_deref().map(year_from_date).unwrap_or(0);
    album.album_artist = credited_names(&release.artist_credit);
    album
}

/// Tracks of `release`, carrying album, album artist and year from `album`.
fn build_tracks(release: &Release, album: &AlbumMetadata) -> Vec<TrackMetadata> {
    let total_discs = u32::try_from(release.media.len()).unwrap_or(u32::MAX);
    let mut tracks = Vec::new();

    for (disc_index, medium) in release.media.iter().enumerate() {
        let total_tracks = u32::try_from(medium.tracks.len()).unwrap_or(u32::MAX);
        let disc_number = u32::try_from(disc_index + 1).unwrap_or(u32::MAX);

        for (track_index, source) in medium.tracks.iter().enumerate() {
            let mut track = TrackMetadata::new(source.title.clone().unwrap_or_default());
            track.album.clone_from(&album.album);
            track.album_artist.clone_from(&album.album_artist);
            track.year = album.year;

            track.track_number = source
                .position
                .unwrap_or_else(|| u32::try_from(track_index + 1).unwrap_or(u32::MAX));
            track.total_tracks = total_tracks;
            track.disc_number = disc_number;
            track.total_discs = total_discs;
            track.duration_seconds = source
                .length
                .map(|ms| u32::try_from(ms / 1000).unwrap_or(u32::MAX))
                .unwrap_or(0);
            track.external_id = source.recording.id.clone().unwrap_or_default();

            let credits = if source.artist_credit.is_empty() {
                &source.recording.artist_credit
            } else {
                &source.artist_credit
            };
            track.artist = credited_names(credits);
            if track.artist.is_empty() {
                track.artist.clone_from(&album.album_artist);
            }

            tracks.push(track);
        }
    }

    tracks
}
