// SPDX-License-Identifier: GPL-3.0-or-later

//! Manual reconciliation of a fetched album against local tracks.
//!
//! Both sides are displayed as independently reorderable rows. Rows are a
//! permutation over the tracks the session was created with; explicit pairs
//! are kept by track identity, so moving rows never changes what is paired.
//! [`MatchResult`] indices are track identities: the position in the fetched
//! album and in the user's selection.

use crate::matching::{score_pair, MatchOptions};
use std::fmt;
use thiserror::Error;
use tracing::debug;
use tracksmith_domain::{AlbumMetadata, LocalTrack, MatchResult, TrackMetadata};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Canonical,
    Local,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Canonical => "canonical",
            Side::Local => "local",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManualMatchError {
    #[error("{side} row {row} is out of range ({len} rows)")]
    RowOutOfRange { side: Side, row: usize, len: usize },
}

pub type ManualMatchResult<T> = Result<T, ManualMatchError>;

/// Outcome of a session operation, for a status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub changed: bool,
    pub message: String,
}

impl SessionStatus {
    fn changed(message: impl Into<String>) -> Self {
        Self {
            changed: true,
            message: message.into(),
        }
    }

    fn unchanged(message: impl Into<String>) -> Self {
        Self {
            changed: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Pair {
    canonical: usize,
    local: usize,
    confidence: f32,
    reason: String,
}

/// Move `count` rows starting at `source` so they land before row `destination`
/// of the original sequence. A destination inside the moved block is a no-op.
fn move_rows(
    order: &mut Vec<usize>,
    side: Side,
    source: usize,
    count: usize,
    destination: usize,
) -> ManualMatchResult<bool> {
    let len = order.len();
    let end = source.checked_add(count).filter(|end| *end <= len);
    let Some(end) = end.filter(|_| source < len) else {
        return Err(ManualMatchError::RowOutOfRange {
            side,
            row: source.saturating_add(count.saturating_sub(1)),
            len,
        });
    };
    if destination > len {
        return Err(ManualMatchError::RowOutOfRange {
            side,
            row: destination,
            len,
        });
    }
    if count == 0 || (source..=end).contains(&destination) {
        return Ok(false);
    }

    let moved: Vec<usize> = order.drain(source..end).collect();
    let insert_at = if destination > source {
        destination - count
    } else {
        destination
    };
    order.splice(insert_at..insert_at, moved);
    Ok(true)
}

fn check_rows(rows: &[usize], side: Side, len: usize) -> ManualMatchResult<Vec<usize>> {
    if let Some(&row) = rows.iter().find(|row| **row >= len) {
        return Err(ManualMatchError::RowOutOfRange { side, row, len });
    }
    let mut sorted = rows.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    Ok(sorted)
}

/// Two reorderable track lists plus explicit pairs between them.
#[derive(Debug, Clone)]
pub struct ManualMatchSession {
    canonical_tracks: Vec<TrackMetadata>,
    local_tracks: Vec<LocalTrack>,
    canonical_order: Vec<usize>,
    local_order: Vec<usize>,
    pairs: Vec<Pair>,
    options: MatchOptions,
}

impl ManualMatchSession {
    pub fn new(album: &AlbumMetadata, local_tracks: Vec<LocalTrack>, options: MatchOptions) -> Self {
        let canonical_tracks = album.tracks.clone();
        Self {
            canonical_order: (0..canonical_tracks.len()).collect(),
            local_order: (0..local_tracks.len()).collect(),
            canonical_tracks,
            local_tracks,
            pairs: Vec::new(),
            options,
        }
    }

    /// Start from previously proposed matches (e.g. automatic ones). Invalid
    /// or out-of-range results are ignored; a later result overrides earlier
    /// ones sharing an endpoint.
    pub fn with_matches(mut self, results: &[MatchResult]) -> Self {
        for result in results {
            let (Some(local), Some(canonical)) = (result.track_index, result.metadata_index) else {
                continue;
            };
            if local < self.local_tracks.len() && canonical < self.canonical_tracks.len() {
                self.insert_pair(Pair {
                    canonical,
                    local,
                    confidence: result.confidence,
                    reason: result.reason.clone(),
                });
            }
        }
        self
    }

    pub fn canonical_len(&self) -> usize {
        self.canonical_order.len()
    }

    pub fn local_len(&self) -> usize {
        self.local_order.len()
    }

    /// Canonical tracks in row order.
    pub fn canonical_rows(&self) -> impl Iterator<Item = &TrackMetadata> + '_ {
        self.canonical_order.iter().map(|&id| &self.canonical_tracks[id])
    }

    /// Local tracks in row order.
    pub fn local_rows(&self) -> impl Iterator<Item = &LocalTrack> + '_ {
        self.local_order.iter().map(|&id| &self.local_tracks[id])
    }

    /// Album position of the track shown at each canonical row.
    pub fn canonical_order(&self) -> &[usize] {
        &self.canonical_order
    }

    /// Selection position of the track shown at each local row.
    pub fn local_order(&self) -> &[usize] {
        &self.local_order
    }

    /// Row currently showing the local track paired with the track at `canonical_row`.
    pub fn paired_local_row(&self, canonical_row: usize) -> Option<usize> {
        let canonical = *self.canonical_order.get(canonical_row)?;
        let pair = self.pairs.iter().find(|pair| pair.canonical == canonical)?;
        self.local_order.iter().position(|&id| id == pair.local)
    }

    /// Explicit pairs as match results.
    pub fn matches(&self) -> Vec<MatchResult> {
        self.pairs
            .iter()
            .map(|pair| {
                MatchResult::matched(
                    pair.local,
                    &self.local_tracks[pair.local],
                    pair.canonical,
                    &self.canonical_tracks[pair.canonical],
                    pair.confidence,
                    pair.reason.clone(),
                )
            })
            .collect()
    }

    pub fn move_canonical_rows(&mut self, source: usize, count: usize, destination: usize) -> ManualMatchResult<bool> {
        move_rows(&mut self.canonical_order, Side::Canonical, source, count, destination)
    }

    pub fn move_local_rows(&mut self, source: usize, count: usize, destination: usize) -> ManualMatchResult<bool> {
        move_rows(&mut self.local_order, Side::Local, source, count, destination)
    }

    /// Returns false when `row` is already first.
    pub fn move_canonical_up(&mut self, row: usize) -> ManualMatchResult<bool> {
        if row == 0 {
            return check_rows(&[row], Side::Canonical, self.canonical_len()).map(|_| false);
        }
        self.move_canonical_rows(row, 1, row - 1)
    }

    /// Returns false when `row` is already last.
    pub fn move_canonical_down(&mut self, row: usize) -> ManualMatchResult<bool> {
        check_rows(&[row], Side::Canonical, self.canonical_len())?;
        if row + 1 == self.canonical_len() {
            return Ok(false);
        }
        self.move_canonical_rows(row, 1, row + 2)
    }

    pub fn move_local_up(&mut self, row: usize) -> ManualMatchResult<bool> {
        if row == 0 {
            return check_rows(&[row], Side::Local, self.local_len()).map(|_| false);
        }
        self.move_local_rows(row, 1, row - 1)
    }

    pub fn move_local_down(&mut self, row: usize) -> ManualMatchResult<bool> {
        check_rows(&[row], Side::Local, self.local_len())?;
        if row + 1 == self.local_len() {
            return Ok(false);
        }
        self.move_local_rows(row, 1, row + 2)
    }

    fn insert_pair(&mut self, pair: Pair) {
        self.pairs
            .retain(|existing| existing.local != pair.local && existing.canonical != pair.canonical);
        self.pairs.push(pair);
    }

    /// Pair selected rows positionally, in ascending row order. Surplus
    /// selections on the larger side stay unpaired. Existing pairs touching
    /// either endpoint are replaced.
    pub fn pair(&mut self, canonical_rows: &[usize], local_rows: &[usize]) -> ManualMatchResult<SessionStatus> {
        let canonical_rows = check_rows(canonical_rows, Side::Canonical, self.canonical_len())?;
        let local_rows = check_rows(local_rows, Side::Local, self.local_len())?;

        if canonical_rows.is_empty() || local_rows.is_empty() {
            return Ok(SessionStatus::unchanged("Select tracks on both sides to match"));
        }

        let count = canonical_rows.len().min(local_rows.len());
        for (&canonical_row, &local_row) in canonical_rows.iter().zip(&local_rows) {
            self.insert_pair(Pair {
                canonical: self.canonical_order[canonical_row],
                local: self.local_order[local_row],
                confidence: 1.0,
                reason: "Manual match".to_string(),
            });
        }

        debug!(target: "matching", count, "paired rows manually");
        Ok(SessionStatus::changed(format!("Matched {count} track(s)")))
    }

    /// Remove every pair touching a selected row on either side.
    pub fn unpair(&mut self, canonical_rows: &[usize], local_rows: &[usize]) -> ManualMatchResult<SessionStatus> {
        let canonical_rows = check_rows(canonical_rows, Side::Canonical, self.canonical_len())?;
        let local_rows = check_rows(local_rows, Side::Local, self.local_len())?;

        let canonical: Vec<usize> = canonical_rows.iter().map(|&row| self.canonical_order[row]).collect();
        let local: Vec<usize> = local_rows.iter().map(|&row| self.local_order[row]).collect();

        let before = self.pairs.len();
        self.pairs
            .retain(|pair| !canonical.contains(&pair.canonical) && !local.contains(&pair.local));
        let removed = before - self.pairs.len();

        if removed == 0 {
            return Ok(SessionStatus::unchanged("No tracks selected to unmatch"));
        }
        Ok(SessionStatus::changed(format!("Unmatched {removed} track(s)")))
    }

    /// Reorder local rows so that each canonical row's best-scoring local
    /// track sits on the same row. Unmatched local tracks follow in their
    /// current order. Canonical rows and explicit pairs are untouched.
    pub fn auto_arrange(&mut self) -> SessionStatus {
        let mut used = vec![false; self.local_order.len()];
        let mut arranged = Vec::with_capacity(self.local_order.len());

        for &canonical_id in &self.canonical_order {
            let canonical = &self.canonical_tracks[canonical_id];
            let mut best: Option<(usize, f32)> = None;

            for (row, &local_id) in self.local_order.iter().enumerate() {
                if used[row] {
                    continue;
                }
                let score = score_pair(&self.local_tracks[local_id], canonical, &self.options);
                if score.is_acceptable() && best.map_or(true, |(_, current)| score.score > current) {
                    best = Some((row, score.score));
                }
            }

            if let Some((row, _)) = best {
                used[row] = true;
                arranged.push(self.local_order[row]);
            }
        }

        let matched = arranged.len();
        arranged.extend(
            self.local_order
                .iter()
                .zip(&used)
                .filter(|(_, used)| !**used)
                .map(|(&id, _)| id),
        );

        let changed = arranged != self.local_order;
        self.local_order = arranged;

        debug!(target: "matching", matched, total = self.local_order.len(), "auto-arranged local rows");
        SessionStatus {
            changed,
            message: format!(
                "Auto-matched and reordered {}/{} tracks",
                matched,
                self.local_order.len()
            ),
        }
    }

    /// Restore the local rows to the order the session started with.
    pub fn reset_local_order(&mut self) -> SessionStatus {
        let original: Vec<usize> = (0..self.local_tracks.len()).collect();
        let changed = original != self.local_order;
        self.local_order = original;
        SessionStatus {
            changed,
            message: "Local tracks reset to original order".to_string(),
        }
    }

    /// Pair row `i` of both sides for every row present on both; explicit
    /// pairs are discarded.
    pub fn commit(self) -> Vec<MatchResult> {
        self.canonical_order
            .iter()
            .zip(&self.local_order)
            .map(|(&canonical, &local)| {
                MatchResult::matched(
                    local,
                    &self.local_tracks[local],
                    canonical,
                    &self.canonical_tracks[canonical],
                    1.0,
                    "Position match",
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracksmith_domain::SourceType;

    fn album(titles: &[&str]) -> AlbumMetadata {
        let mut album = AlbumMetadata::new(SourceType::MusicBrainz, "https://musicbrainz.org/release/x");
        album.tracks = titles.iter().map(|title| TrackMetadata::new(*title)).collect();
        album
    }

    fn locals(titles: &[&str]) -> Vec<LocalTrack> {
        titles
            .iter()
            .map(|title| LocalTrack::new(format!("/music/{title}.mp3"), *title))
            .collect()
    }

    fn session(canonical: &[&str], local: &[&str]) -> ManualMatchSession {
        ManualMatchSession::new(&album(canonical), locals(local), MatchOptions::default())
    }

    fn local_titles(session: &ManualMatchSession) -> Vec<String> {
        session.local_rows().map(|track| track.title.clone()).collect()
    }

    #[test]
    fn pairing_overwrites_existing_match_for_endpoint() {
        let mut session = session(&["A", "B", "C"], &["x", "y", "z"]);

        session.pair(&[1], &[2]).unwrap();
        session.pair(&[0], &[2]).unwrap();

        let matches = session.matches();
        let referencing: Vec<_> = matches.iter().filter(|m| m.track_index == Some(2)).collect();
        assert_eq!(referencing.len(), 1);
        assert_eq!(referencing[0].metadata_index, Some(0));
        assert_eq!(referencing[0].confidence, 1.0);
        assert_eq!(referencing[0].reason, "Manual match");
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn pairing_is_positional_over_sorted_selections() {
        let mut session = session(&["A", "B", "C", "D"], &["w", "x", "y"]);

        let status = session.pair(&[3, 0, 2], &[1, 0]).unwrap();
        assert_eq!(status, SessionStatus::changed("Matched 2 track(s)"));

        let mut pairs: Vec<_> = session
            .matches()
            .iter()
            .map(|m| (m.metadata_index, m.track_index))
            .collect();
        pairs.sort();
        assert_eq!(pairs, vec![(Some(0), Some(0)), (Some(2), Some(1))]);
    }

    #[test]
    fn pairing_requires_both_sides() {
        let mut session = session(&["A"], &["x"]);
        let status = session.pair(&[0], &[]).unwrap();
        assert!(!status.changed);
        assert_eq!(status.message, "Select tracks on both sides to match");
    }

    #[test]
    fn out_of_range_rows_are_errors() {
        let mut session = session(&["A"], &["x"]);
        assert_eq!(
            session.pair(&[0], &[5]),
            Err(ManualMatchError::RowOutOfRange {
                side: Side::Local,
                row: 5,
                len: 1
            })
        );
        assert!(session.move_canonical_rows(1, 1, 0).is_err());
        assert!(session.move_local_rows(0, 1, 2).is_err());
    }

    #[test]
    fn unpair_counts_removed_matches() {
        let mut session = session(&["A", "B", "C"], &["x", "y", "z"]);
        session.pair(&[0, 1, 2], &[0, 1, 2]).unwrap();

        let status = session.unpair(&[0], &[1]).unwrap();
        assert_eq!(status, SessionStatus::changed("Unmatched 2 track(s)"));
        assert_eq!(session.matches().len(), 1);

        let status = session.unpair(&[], &[]).unwrap();
        assert_eq!(status, SessionStatus::unchanged("No tracks selected to unmatch"));
    }

    #[test]
    fn moves_are_permutations() {
        let mut session = session(&[], &["a", "b", "c", "d", "e"]);

        assert!(session.move_local_rows(0, 2, 4).unwrap());
        assert_eq!(local_titles(&session), ["c", "d", "a", "b", "e"]);

        assert!(session.move_local_rows(3, 2, 0).unwrap());
        assert_eq!(local_titles(&session), ["b", "e", "c", "d", "a"]);

        assert!(session.move_local_rows(0, 1, 5).unwrap());
        assert_eq!(local_titles(&session), ["e", "c", "d", "a", "b"]);

        assert!(!session.move_local_rows(1, 2, 2).unwrap());
        assert!(!session.move_local_rows(1, 2, 3).unwrap());

        let mut order = session.local_order().to_vec();
        order.sort_unstable();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn up_and_down_helpers() {
        let mut session = session(&["A", "B", "C"], &["x", "y"]);

        assert!(!session.move_canonical_up(0).unwrap());
        assert!(session.move_canonical_down(0).unwrap());
        assert_eq!(session.canonical_order(), &[1, 0, 2]);
        assert!(session.move_canonical_up(2).unwrap());
        assert_eq!(session.canonical_order(), &[1, 2, 0]);
        assert!(!session.move_canonical_down(2).unwrap());

        assert!(session.move_local_down(0).unwrap());
        assert_eq!(local_titles(&session), ["y", "x"]);
        assert!(!session.move_local_down(1).unwrap());
        assert!(session.move_local_up(1).unwrap());
        assert_eq!(local_titles(&session), ["x", "y"]);
        assert!(session.move_local_up(2).is_err());
    }

    #[test]
    fn pairs_follow_tracks_across_moves() {
        let mut session = session(&["A", "B"], &["x", "y"]);
        session.pair(&[0], &[1]).unwrap();
        assert_eq!(session.paired_local_row(0), Some(1));

        session.move_local_rows(1, 1, 0).unwrap();
        assert_eq!(session.paired_local_row(0), Some(0));
        assert_eq!(session.matches()[0].target_title, "y");
    }

    #[test]
    fn auto_arrange_reorders_local_rows_only() {
        let mut session = session(
            &["Rakkamma", "Sundari", "Yamunai Aatrile"],
            &["Bonus", "yamunai aatrile", "Sundari (Female)", "Rakkamma"],
        );

        let status = session.auto_arrange();
        assert!(status.changed);
        assert_eq!(status.message, "Auto-matched and reordered 3/4 tracks");
        assert_eq!(
            local_titles(&session),
            ["Rakkamma", "Sundari (Female)", "yamunai aatrile", "Bonus"]
        );
        assert_eq!(session.canonical_order(), &[0, 1, 2]);
        assert!(session.matches().is_empty());

        let status = session.reset_local_order();
        assert!(status.changed);
        assert_eq!(status.message, "Local tracks reset to original order");
        assert_eq!(session.local_order(), &[0, 1, 2, 3]);
    }

    #[test]
    fn commit_pairs_rows_by_position() {
        let session = session(&["A", "B", "C", "D", "E"], &["x", "y", "z"]);
        let results = session.commit();

        assert_eq!(results.len(), 3);
        for (row, result) in results.iter().enumerate() {
            assert_eq!(result.confidence, 1.0);
            assert_eq!(result.reason, "Position match");
            assert_eq!(result.track_index, Some(row));
            assert_eq!(result.metadata_index, Some(row));
        }
    }

    #[test]
    fn commit_uses_current_order_and_drops_explicit_pairs() {
        let mut session = session(&["A", "B"], &["x", "y", "z"]);
        session.pair(&[0], &[2]).unwrap();
        session.move_local_rows(2, 1, 0).unwrap();

        let results = session.commit();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].target_title, "z");
        assert_eq!(results[0].track_index, Some(2));
        assert_eq!(results[0].source_metadata.title, "A");
        assert_eq!(results[1].target_title, "x");
        assert_eq!(results[1].reason, "Position match");
    }

    #[test]
    fn seeded_matches_keep_one_per_endpoint() {
        let album = album(&["A", "B"]);
        let tracks = locals(&["x", "y"]);
        let seed = vec![
            MatchResult::matched(0, &tracks[0], 0, &album.tracks[0], 0.9, "Exact title match"),
            MatchResult::matched(1, &tracks[1], 0, &album.tracks[0], 0.7, "Partial title match"),
            MatchResult::unmatched(1, &tracks[1]),
        ];

        let session = ManualMatchSession::new(&album, tracks, MatchOptions::default()).with_matches(&seed);
        let matches = session.matches();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].track_index, Some(1));
        assert_eq!(matches[0].reason, "Partial title match");
    }
}
