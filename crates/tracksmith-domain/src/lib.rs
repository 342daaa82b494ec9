// SPDX-License-Identifier: GPL-3.0-or-later
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod text;

pub use text::{normalize, parse_duration};

// ============================================================================
// Enumerations
// ============================================================================

/// Where a piece of canonical metadata came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Hand-authored encyclopedia article (Wikipedia).
    #[default]
    Wikipedia,
    /// Structured music database (MusicBrainz).
    MusicBrainz,
    /// Reserved for a future discography database source.
    Discogs,
    /// Reserved for a future CD database source.
    Gnudb,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wikipedia => "wikipedia",
            Self::MusicBrainz => "musicbrainz",
            Self::Discogs => "discogs",
            Self::Gnudb => "gnudb",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "wikipedia" | "wiki" => Some(Self::Wikipedia),
            "musicbrainz" | "mb" => Some(Self::MusicBrainz),
            "discogs" => Some(Self::Discogs),
            "gnudb" => Some(Self::Gnudb),
            _ => None,
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a single gateway request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    #[default]
    Idle,
    Fetching,
    Success,
    Error,
}

impl FetchStatus {
    /// A gateway accepts a new request in every state but `Fetching`; a new
    /// request while fetching supersedes the pending one.
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Fetching)
    }
}

/// Coarse confidence classification used for display and review decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
    None,
}

impl ConfidenceBand {
    pub fn from_confidence(confidence: f32) -> Self {
        if confidence >= 0.8 {
            Self::High
        } else if confidence >= 0.6 {
            Self::Medium
        } else if confidence > 0.0 {
            Self::Low
        } else {
            Self::None
        }
    }
}

// ============================================================================
// Canonical metadata
// ============================================================================

/// One canonical track. Absent text is empty, absent numbers are zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub album_artist: String,
    pub lyricist: String,
    pub composer: String,
    pub music_director: String,
    /// 1-based, unique within its disc.
    pub track_number: u32,
    pub total_tracks: u32,
    pub disc_number: u32,
    pub total_discs: u32,
    pub year: u32,
    pub duration_seconds: u32,
    pub isrc: String,
    /// External database identifier (MusicBrainz recording id).
    pub external_id: String,
}

impl Default for TrackMetadata {
    fn default() -> Self {
        Self {
            title: String::new(),
            artist: String::new(),
            album: String::new(),
            album_artist: String::new(),
            lyricist: String::new(),
            composer: String::new(),
            music_director: String::new(),
            track_number: 0,
            total_tracks: 0,
            disc_number: 1,
            total_discs: 1,
            year: 0,
            duration_seconds: 0,
            isrc: String::new(),
            external_id: String::new(),
        }
    }
}

impl TrackMetadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Duration as `m:ss`, or an empty string when unknown.
    pub fn formatted_duration(&self) -> String {
        if self.duration_seconds == 0 {
            return String::new();
        }
        format!(
            "{}:{:02}",
            self.duration_seconds / 60,
            self.duration_seconds % 60
        )
    }
}

/// An album as produced by one extractor run. Tracks keep source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AlbumMetadata {
    pub album: String,
    pub album_artist: String,
    pub music_director: String,
    pub year: u32,
    pub country: String,
    /// Source-specific release identifier (MusicBrainz release or release-group id).
    pub release_id: String,
    pub source_url: String,
    pub source: SourceType,
    pub tracks: Vec<TrackMetadata>,
}

impl AlbumMetadata {
    pub fn new(source: SourceType, source_url: impl Into<String>) -> Self {
        Self {
            source,
            source_url: source_url.into(),
            ..Self::default()
        }
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn has_tracks(&self) -> bool {
        !self.tracks.is_empty()
    }

    /// Copy the album title onto every track.
    pub fn backfill_album_title(&mut self) {
        for track in &mut self.tracks {
            track.album.clone_from(&self.album);
        }
    }
}

// ============================================================================
// Local collection & matching
// ============================================================================

/// A track from the user's selection, read-only for the matching engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LocalTrack {
    pub path: PathBuf,
    pub title: String,
    pub artist: String,
    pub album_artist: String,
    pub duration_ms: u64,
    pub track_number: u32,
}

impl LocalTrack {
    pub fn new(path: impl Into<PathBuf>, title: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn duration_seconds(&self) -> u32 {
        u32::try_from(self.duration_ms / 1000).unwrap_or(u32::MAX)
    }
}

/// One proposed correspondence between a local track and a canonical track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Position of the local track in the user's selection.
    pub track_index: Option<usize>,
    /// Position of the canonical track in the fetched album.
    pub metadata_index: Option<usize>,
    /// 0.0 to 1.0
    pub confidence: f32,
    pub reason: String,
    /// Whether the user wants this match applied.
    pub selected: bool,
    pub source_metadata: TrackMetadata,
    pub target_path: PathBuf,
    pub target_title: String,
}

impl MatchResult {
    pub fn matched(
        track_index: usize,
        local: &LocalTrack,
        metadata_index: usize,
        canonical: &TrackMetadata,
        confidence: f32,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            track_index: Some(track_index),
            metadata_index: Some(metadata_index),
            confidence: confidence.clamp(0.0, 1.0),
            reason: reason.into(),
            selected: true,
            source_metadata: canonical.clone(),
            target_path: local.path.clone(),
            target_title: local.title.clone(),
        }
    }

    pub fn unmatched(track_index: usize, local: &LocalTrack) -> Self {
        Self {
            track_index: Some(track_index),
            metadata_index: None,
            confidence: 0.0,
            reason: "No match".to_string(),
            selected: false,
            source_metadata: TrackMetadata::default(),
            target_path: local.path.clone(),
            target_title: local.title.clone(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.track_index.is_some() && self.metadata_index.is_some()
    }

    pub fn band(&self) -> ConfidenceBand {
        ConfidenceBand::from_confidence(self.confidence)
    }

    pub fn is_high_confidence(&self) -> bool {
        self.band() == ConfidenceBand::High
    }

    pub fn is_medium_confidence(&self) -> bool {
        self.band() == ConfidenceBand::Medium
    }

    pub fn is_low_confidence(&self) -> bool {
        self.band() == ConfidenceBand::Low
    }

    /// True when the match is valid and reaches the caller's threshold.
    pub fn meets_threshold(&self, threshold: f32) -> bool {
        self.is_valid() && self.confidence >= threshold
    }

    pub fn references(&self, metadata_index: Option<usize>, track_index: Option<usize>) -> bool {
        (metadata_index.is_some() && self.metadata_index == metadata_index)
            || (track_index.is_some() && self.track_index == track_index)
    }
}
