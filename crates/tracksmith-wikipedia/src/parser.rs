// SPDX-License-Identifier: GPL-3.0-or-later

//! Track-listing extraction from Wikipedia article HTML.
//!
//! Only the narrow vocabulary of soundtrack articles is understood: the
//! `<title>` element, level 2/3 headings with an `id`, and a `wikitable` or
//! `tracklist` table. Anything else degrades to fewer or zero tracks.

use crate::columns::{detect_columns, TableColumns};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;
use tracksmith_domain::{normalize, parse_duration, AlbumMetadata, SourceType, TrackMetadata};

const FOOTER_MARKER: &str = "tracklist-total-length";

lazy_static! {
    static ref PAGE_TITLE: Regex =
        Regex::new(r"(?i)<title>([^<]+)</title>").expect("title regex is valid");
    static ref WIKIPEDIA_SUFFIX: Regex =
        Regex::new(r"(?i)\s*[-\x{2013}\x{2014}]\s*Wikipedia.*$").expect("suffix regex is valid");
    static ref FILM_QUALIFIER: Regex =
        Regex::new(r"(?i)\s*\(film\)\s*$").expect("film regex is valid");
    static ref TRACK_SECTION_HEADING: Regex = Regex::new(
        r#"(?is)<h[23]\b[^>]*\sid="(?:soundtrack|music|track[^"]*)"[^>]*>.*?</h[23]>"#
    )
    .expect("section heading regex is valid");
    static ref ANY_SECTION_HEADING: Regex =
        Regex::new(r"(?i)<h[23]\b[^>]*>").expect("heading regex is valid");
    static ref TRACK_TABLE: Regex = Regex::new(
        r#"(?is)<table\b[^>]*\bclass="[^"]*(?:wikitable|tracklist)[^"]*"[^>]*>(.*?)</table>"#
    )
    .expect("table regex is valid");
    static ref TABLE_ROW: Regex = Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr>").expect("row regex is valid");
    static ref TABLE_CELL: Regex =
        Regex::new(r"(?is)<t[hd]\b[^>]*>(.*?)</t[hd]>").expect("cell regex is valid");
    static ref HEADER_CELL_OPEN: Regex = Regex::new(r"(?i)<th\b").expect("th regex is valid");
    static ref DATA_CELL_OPEN: Regex = Regex::new(r"(?i)<td\b").expect("td regex is valid");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowKind {
    Header,
    Data,
    Other,
}

fn classify_row(row: &str) -> RowKind {
    if DATA_CELL_OPEN.is_match(row) {
        RowKind::Data
    } else if HEADER_CELL_OPEN.is_match(row) {
        RowKind::Header
    } else {
        RowKind::Other
    }
}

/// Parse a Wikipedia article into canonical album metadata.
///
/// Never fails; a page without a recognizable track listing yields an album
/// with zero tracks.
pub fn parse_page(html: &[u8], source_url: &str) -> AlbumMetadata {
    let html = String::from_utf8_lossy(html);

    let mut album = AlbumMetadata::new(SourceType::Wikipedia, source_url);
    album.album = extract_page_title(&html);

    match extract_track_section(&html) {
        Some(section) => album.tracks = parse_track_table(section),
        None => debug!(target: "wikipedia", "no soundtrack/music/track listing section found"),
    }

    if let Some(director) = album
        .tracks
        .iter()
        .map(|track| track.music_director.as_str())
        .find(|director| !director.is_empty())
    {
        album.music_director = director.to_string();
    }

    album.backfill_album_title();

    debug!(
        target: "wikipedia",
        album = %album.album,
        tracks = album.tracks.len(),
        "parsed Wikipedia page"
    );

    album
}

/// Article title without the " - Wikipedia" suffix or a "(film)" qualifier.
pub fn extract_page_title(html: &str) -> String {
    let Some(captures) = PAGE_TITLE.captures(html) else {
        return String::new();
    };

    let title = WIKIPEDIA_SUFFIX.replace(&captures[1], "");
    let title = FILM_QUALIFIER.replace(title.trim(), "");
    normalize(title.trim())
}

/// Everything between the first soundtrack-like heading and the next level
/// 2/3 heading (or the end of the document).
pub fn extract_track_section(html: &str) -> Option<&str> {
    let heading = TRACK_SECTION_HEADING.find(html)?;
    let start = heading.end();
    let end = ANY_SECTION_HEADING
        .find_at(html, start)
        .map(|next| next.start())
        .unwrap_or(html.len());

    debug!(target: "wikipedia", start, end, "track section located");
    Some(&html[start..end])
}

/// Parse the first track-listing table found in `section`.
pub fn parse_track_table(section: &str) -> Vec<TrackMetadata> {
    let Some(table) = TRACK_TABLE.captures(section) else {
        debug!(target: "wikipedia", "no wikitable/tracklist found in section");
        return Vec::new();
    };

    let mut tracks: Vec<TrackMetadata> = Vec::new();
    let mut columns: Option<TableColumns> = None;

    for row in TABLE_ROW.captures_iter(&table[1]) {
        // The marker class sits on the <tr> or on one of its cells.
        if row[0].contains(FOOTER_MARKER) {
            continue;
        }
        let content = &row[1];

        match (classify_row(content), columns) {
            (RowKind::Header, None) => {
                let headers = row_cells(content);
                let detected = detect_columns(&headers);
                debug!(target: "wikipedia", ?headers, ?detected, "detected track table columns");
                columns = Some(detected);
            }
            (RowKind::Header, Some(_)) => break,
            (RowKind::Data, Some(detected)) => {
                let cells = row_cells(content);
                if let Some(track) = build_track(&cells, &detected, tracks.len() + 1) {
                    tracks.push(track);
                }
            }
            _ => {}
        }
    }

    let total = u32::try_from(tracks.len()).unwrap_or(u32::MAX);
    for track in &mut tracks {
        track.total_tracks = total;
    }

    debug!(target: "wikipedia", tracks = tracks.len(), "parsed track table");
    tracks
}

fn row_cells(row: &str) -> Vec<String> {
    TABLE_CELL
        .captures_iter(row)
        .map(|cell| normalize(&cell[1]))
        .collect()
}

fn build_track(cells: &[String], columns: &TableColumns, position: usize) -> Option<TrackMetadata> {
    if cells.is_empty() {
        return None;
    }

    let cell = |index: Option<usize>| index.and_then(|i| cells.get(i)).map(String::as_str);

    let title = match columns.title {
        Some(index) => cells.get(index).cloned().unwrap_or_default(),
        None => cells[0].clone(),
    };
    if title.is_empty() {
        return None;
    }

    let mut track = TrackMetadata::new(title);
    track.track_number = cell(columns.number)
        .and_then(parse_track_number)
        .unwrap_or_else(|| u32::try_from(position).unwrap_or(u32::MAX));

    if let Some(artist) = cell(columns.artist) {
        track.artist = artist.to_string();
    }
    if let Some(lyricist) = cell(columns.lyricist) {
        track.lyricist = lyricist.to_string();
    }
    if let Some(music) = cell(columns.music) {
        track.music_director = music.to_string();
        if track.composer.is_empty() {
            track.composer.clone_from(&track.music_director);
        }
    }
    if let Some(duration) = cell(columns.duration) {
        track.duration_seconds = parse_duration(duration);
    }

    Some(track)
}

fn parse_track_number(text: &str) -> Option<u32> {
    text.trim().trim_end_matches('.').parse::<u32>().ok()
}
