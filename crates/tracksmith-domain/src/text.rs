// SPDX-License-Identifier: GPL-3.0-or-later

//! Text and duration normalization shared by the extractors.
//!
//! Both functions are total: untrusted input never makes them fail.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref MARKUP_TAG: Regex = Regex::new(r"<[^>]+>").expect("markup regex is valid");
    static ref CITATION: Regex = Regex::new(r"\[\d+\]").expect("citation regex is valid");
    static ref EDIT_MARKER: Regex = Regex::new(r"(?i)\[edit\]").expect("edit regex is valid");
    static ref MINUTES_COLON: Regex =
        Regex::new(r"(\d+):(\d+)").expect("colon duration regex is valid");
    static ref MINUTES_DOT: Regex =
        Regex::new(r"(\d+)\.(\d+)").expect("dot duration regex is valid");
}

const ENTITIES: [(&str, &str); 6] = [
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&nbsp;", " "),
];

const QUOTES: [char; 3] = ['"', '\u{201C}', '\u{201D}'];

/// Strip markup, citation and `[edit]` markers, decode the common HTML
/// entities, drop double quotes and collapse whitespace.
///
/// Applied until the output stops changing, so decoding `&lt;b&gt;` into a
/// tag cannot leave markup behind for a second call to remove.
pub fn normalize(raw: &str) -> String {
    let mut current = normalize_once(raw);
    loop {
        let next = normalize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_once(raw: &str) -> String {
    let without_tags = MARKUP_TAG.replace_all(raw, "");
    let without_citations = CITATION.replace_all(&without_tags, "");
    let without_edits = EDIT_MARKER.replace_all(&without_citations, "");

    let mut decoded = without_edits.into_owned();
    for (entity, replacement) in ENTITIES {
        if decoded.contains(entity) {
            decoded = decoded.replace(entity, replacement);
        }
    }

    decoded
        .replace(&QUOTES[..], "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Convert `"3:45"`, `"3.45"` or `"225"` into seconds.
///
/// Returns 0 for anything unparseable; callers treat 0 as "unknown".
pub fn parse_duration(text: &str) -> u32 {
    let trimmed = text.trim();

    for pattern in [&*MINUTES_COLON, &*MINUTES_DOT] {
        if let Some(captures) = pattern.captures(trimmed) {
            let minutes = captures[1].parse::<u32>().unwrap_or(0);
            let seconds = captures[2].parse::<u32>().unwrap_or(0);
            return minutes.saturating_mul(60).saturating_add(seconds);
        }
    }

    trimmed.parse::<u32>().unwrap_or(0)
}
