// SPDX-License-Identifier: GPL-3.0-or-later

//! MusicBrainz identifiers and search queries.

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use uuid::Uuid;

lazy_static! {
    static ref ENTITY_URL: Regex = Regex::new(
        r"(?i)musicbrainz\.org/(release|release-group)/([0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12})"
    )
    .expect("entity url regex is valid");
    static ref BARE_MBID: Regex =
        Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
            .expect("mbid regex is valid");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MbEntity {
    Release,
    ReleaseGroup,
}

impl MbEntity {
    /// Path segment used by both the web site and the web service.
    pub fn as_str(&self) -> &'static str {
        match self {
            MbEntity::Release => "release",
            MbEntity::ReleaseGroup => "release-group",
        }
    }
}

impl fmt::Display for MbEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A release or release group identified by its MBID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MbReference {
    pub entity: MbEntity,
    pub id: Uuid,
}

/// Recognize `.../release/<mbid>`, `.../release-group/<mbid>` or a bare MBID
/// (taken as a release).
pub fn parse_reference(input: &str) -> Option<MbReference> {
    let input = input.trim();

    if let Some(captures) = ENTITY_URL.captures(input) {
        let entity = if captures[1].eq_ignore_ascii_case("release-group") {
            MbEntity::ReleaseGroup
        } else {
            MbEntity::Release
        };
        let id = Uuid::parse_str(&captures[2]).ok()?;
        return Some(MbReference { entity, id });
    }

    if BARE_MBID.is_match(input) {
        let id = Uuid::parse_str(input).ok()?;
        return Some(MbReference {
            entity: MbEntity::Release,
            id,
        });
    }

    None
}

/// Lucene query `artist:"..." AND release:"..."` over the non-empty terms.
///
/// Returns `None` when both terms are blank.
pub fn build_search_query(artist: &str, album: &str) -> Option<String> {
    let mut clauses = Vec::with_capacity(2);

    let artist = artist.trim();
    if !artist.is_empty() {
        clauses.push(format!("artist:\"{}\"", escape_term(artist)));
    }

    let album = album.trim();
    if !album.is_empty() {
        clauses.push(format!("release:\"{}\"", escape_term(album)));
    }

    if clauses.is_empty() {
        None
    } else {
        Some(clauses.join(" AND "))
    }
}

fn escape_term(term: &str) -> String {
    term.replace('\\', "\\\\").replace('"', "\\\"")
}
