// SPDX-License-Identifier: GPL-3.0-or-later

//! Header-text heuristics that map track-listing table columns to roles.
//!
//! Rules are evaluated in table order for each header cell; the first rule
//! that matches decides the role, and a role keeps the first column it was
//! assigned.

/// Semantic role of a track-listing column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRole {
    Number,
    Title,
    Artist,
    Lyricist,
    /// Composer or music director.
    Music,
    Duration,
}

/// One keyword rule. Matching is done on lowercased header text.
#[derive(Debug, Clone, Copy)]
pub struct ColumnRule {
    pub role: ColumnRole,
    /// Header matches if it contains any of these.
    pub contains: &'static [&'static str],
    /// Header matches if it is exactly one of these.
    pub equals: &'static [&'static str],
}

impl ColumnRule {
    pub fn matches(&self, header: &str) -> bool {
        self.contains.iter().any(|keyword| header.contains(keyword))
            || self.equals.iter().any(|keyword| header == *keyword)
    }
}

pub const COLUMN_RULES: &[ColumnRule] = &[
    ColumnRule {
        role: ColumnRole::Number,
        contains: &["no", "#"],
        equals: &["sr"],
    },
    ColumnRule {
        role: ColumnRole::Title,
        contains: &["song", "title", "track"],
        equals: &[],
    },
    ColumnRule {
        role: ColumnRole::Artist,
        contains: &["singer", "artist", "vocals", "performed"],
        equals: &[],
    },
    ColumnRule {
        role: ColumnRole::Lyricist,
        contains: &["lyric", "written"],
        equals: &[],
    },
    ColumnRule {
        role: ColumnRole::Music,
        contains: &["music", "composer", "composed"],
        equals: &[],
    },
    ColumnRule {
        role: ColumnRole::Duration,
        contains: &["duration", "length", "time"],
        equals: &[],
    },
];

/// Column index for each detected role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableColumns {
    pub number: Option<usize>,
    pub title: Option<usize>,
    pub artist: Option<usize>,
    pub lyricist: Option<usize>,
    pub music: Option<usize>,
    pub duration: Option<usize>,
}

impl TableColumns {
    pub fn get(&self, role: ColumnRole) -> Option<usize> {
        match role {
            ColumnRole::Number => self.number,
            ColumnRole::Title => self.title,
            ColumnRole::Artist => self.artist,
            ColumnRole::Lyricist => self.lyricist,
            ColumnRole::Music => self.music,
            ColumnRole::Duration => self.duration,
        }
    }

    fn slot_mut(&mut self, role: ColumnRole) -> &mut Option<usize> {
        match role {
            ColumnRole::Number => &mut self.number,
            ColumnRole::Title => &mut self.title,
            ColumnRole::Artist => &mut self.artist,
            ColumnRole::Lyricist => &mut self.lyricist,
            ColumnRole::Music => &mut self.music,
            ColumnRole::Duration => &mut self.duration,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub fn classify_header(header: &str) -> Option<ColumnRole> {
    let lowered = header.to_lowercase();
    COLUMN_RULES
        .iter()
        .find(|rule| rule.matches(&lowered))
        .map(|rule| rule.role)
}

pub fn detect_columns<S: AsRef<str>>(headers: &[S]) -> TableColumns {
    let mut columns = TableColumns::default();

    for (index, header) in headers.iter().enumerate() {
        if let Some(role) = classify_header(header.as_ref()) {
            let slot = columns.slot_mut(role);
            if slot.is_none() {
                *slot = Some(index);
            }
        }
    }

    columns
}
