// SPDX-License-Identifier: GPL-3.0-or-later

//! Automatic alignment of canonical tracks to local tracks.
//!
//! Each local track, in order, takes the best-scoring canonical track not yet
//! taken. The assignment is greedy: an early local track can claim a
//! canonical track that a later one would have matched better.

use tracing::{debug, warn};
use tracksmith_config::MatchingConfig;
use tracksmith_domain::{normalize, AlbumMetadata, LocalTrack, MatchResult, TrackMetadata};

/// Minimum score for a pair to be proposed at all.
pub const ACCEPTANCE_THRESHOLD: f32 = 0.5;

const EXACT_TITLE_SCORE: f32 = 0.8;
const PARTIAL_TITLE_SCORE: f32 = 0.5;
const CLOSE_DURATION_BONUS: f32 = 0.2;
const NEAR_DURATION_BONUS: f32 = 0.1;
const CLOSE_DURATION_SECS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOptions {
    /// Widest duration difference, in seconds, that still earns a bonus.
    pub duration_tolerance_secs: u32,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            duration_tolerance_secs: 5,
        }
    }
}

impl From<&MatchingConfig> for MatchOptions {
    fn from(config: &MatchingConfig) -> Self {
        Self {
            duration_tolerance_secs: config.duration_tolerance_secs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleMatch {
    Exact,
    Partial,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationMatch {
    Close,
    Near,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairScore {
    pub title: TitleMatch,
    pub duration: DurationMatch,
    pub score: f32,
}

impl PairScore {
    pub fn is_acceptable(&self) -> bool {
        self.score >= ACCEPTANCE_THRESHOLD
    }

    pub fn reason(&self) -> String {
        let title = match self.title {
            TitleMatch::Exact => "Exact title match",
            TitleMatch::Partial => "Partial title match",
            TitleMatch::None => "Title mismatch",
        };
        match self.duration {
            DurationMatch::None => title.to_string(),
            _ => format!("{title} + duration match"),
        }
    }
}

/// Lowercased normalized title used for comparisons.
pub fn comparable_title(title: &str) -> String {
    normalize(title).to_lowercase()
}

pub fn score_titles(local: &str, canonical: &str) -> TitleMatch {
    let local = comparable_title(local);
    let canonical = comparable_title(canonical);

    if local.is_empty() || canonical.is_empty() {
        TitleMatch::None
    } else if local == canonical {
        TitleMatch::Exact
    } else if local.contains(&canonical) || canonical.contains(&local) {
        TitleMatch::Partial
    } else {
        TitleMatch::None
    }
}

/// Durations in seconds; 0 means unknown and never matches.
pub fn score_durations(local_secs: u32, canonical_secs: u32, tolerance_secs: u32) -> DurationMatch {
    if local_secs == 0 || canonical_secs == 0 {
        return DurationMatch::None;
    }
    let diff = local_secs.abs_diff(canonical_secs);
    if diff <= CLOSE_DURATION_SECS {
        DurationMatch::Close
    } else if diff <= tolerance_secs {
        DurationMatch::Near
    } else {
        DurationMatch::None
    }
}

pub fn score_pair(local: &LocalTrack, canonical: &TrackMetadata, options: &MatchOptions) -> PairScore {
    let title = score_titles(&local.title, &canonical.title);
    let duration = score_durations(
        local.duration_seconds(),
        canonical.duration_seconds,
        options.duration_tolerance_secs,
    );

    let title_score = match title {
        TitleMatch::Exact => EXACT_TITLE_SCORE,
        TitleMatch::Partial => PARTIAL_TITLE_SCORE,
        TitleMatch::None => 0.0,
    };
    let duration_score = match duration {
        DurationMatch::Close => CLOSE_DURATION_BONUS,
        DurationMatch::Near => NEAR_DURATION_BONUS,
        DurationMatch::None => 0.0,
    };

    PairScore {
        title,
        duration,
        score: (title_score + duration_score).min(1.0),
    }
}

/// Index and score of the best acceptable candidate. Ties keep the earliest.
pub fn best_candidate<'a, I>(local: &LocalTrack, candidates: I, options: &MatchOptions) -> Option<(usize, PairScore)>
where
    I: IntoIterator<Item = (usize, &'a TrackMetadata)>,
{
    let mut best: Option<(usize, PairScore)> = None;
    for (index, canonical) in candidates {
        let score = score_pair(local, canonical, options);
        if !score.is_acceptable() {
            continue;
        }
        if best.map_or(true, |(_, current)| score.score > current.score) {
            best = Some((index, score));
        }
    }
    best
}

/// Greedy one-to-one matcher.
#[derive(Debug, Clone, Default)]
pub struct TrackMatcher {
    options: MatchOptions,
}

impl TrackMatcher {
    pub fn new(options: MatchOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    /// One result per local track, in local order. Unmatched tracks get an
    /// invalid result with confidence 0.
    pub fn match_tracks(&self, local_tracks: &[LocalTrack], album: &AlbumMetadata) -> Vec<MatchResult> {
        let mut consumed = vec![false; album.tracks.len()];
        let mut results = Vec::with_capacity(local_tracks.len());

        for (track_index, local) in local_tracks.iter().enumerate() {
            let candidates = album
                .tracks
                .iter()
                .enumerate()
                .filter(|(index, _)| !consumed[*index]);

            match best_candidate(local, candidates, &self.options) {
                Some((metadata_index, score)) => {
                    consumed[metadata_index] = true;
                    debug!(
                        target: "matching",
                        track_index,
                        metadata_index,
                        score = score.score,
                        "matched local track"
                    );
                    results.push(MatchResult::matched(
                        track_index,
                        local,
                        metadata_index,
                        &album.tracks[metadata_index],
                        score.score,
                        score.reason(),
                    ));
                }
                None => {
                    debug!(target: "matching", track_index, title = %local.title, "no acceptable candidate");
                    results.push(MatchResult::unmatched(track_index, local));
                }
            }
        }

        results
    }
}

/// Clamp a confidence threshold into [0.0, 1.0], warning when it was out of range.
pub fn clamp_threshold(name: &str, value: f32, non_finite_default: f32) -> f32 {
    if !value.is_finite() {
        warn!(target: "matching", name, value, "threshold is not finite, using default {non_finite_default}");
        return non_finite_default;
    }
    if !(0.0..=1.0).contains(&value) {
        let clamped = value.clamp(0.0, 1.0);
        warn!(target: "matching", name, value, clamped, "threshold out of [0.0, 1.0] range, clamping");
        return clamped;
    }
    value
}

/// Counts for a status line such as "Fetched 12 tracks, matched 9/10".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchSummary {
    pub canonical_tracks: usize,
    pub local_tracks: usize,
    /// Valid results at or above the threshold.
    pub accepted: usize,
    /// Valid results below the threshold, left for review.
    pub needs_review: usize,
}

impl MatchSummary {
    pub fn new(album: &AlbumMetadata, results: &[MatchResult], threshold: f32) -> Self {
        let threshold = clamp_threshold("confidence_threshold", threshold, 0.6);
        let accepted = results.iter().filter(|r| r.meets_threshold(threshold)).count();
        let valid = results.iter().filter(|r| r.is_valid()).count();

        Self {
            canonical_tracks: album.tracks.len(),
            local_tracks: results.len(),
            accepted,
            needs_review: valid - accepted,
        }
    }

    pub fn status_line(&self) -> String {
        format!(
            "Fetched {} tracks, matched {}/{}",
            self.canonical_tracks, self.accepted, self.local_tracks
        )
    }
}
