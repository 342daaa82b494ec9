// SPDX-License-Identifier: GPL-3.0-or-later

//! Wikipedia soundtrack-article extraction.
//!
//! Locates the soundtrack or track-listing section of an article, infers the
//! meaning of each table column from its header text, and produces canonical
//! album metadata.

pub mod client;
pub mod columns;
pub mod error;
pub mod parser;

pub use client::{is_article_url, WikipediaClient, WikipediaClientBuilder};
pub use columns::{classify_header, detect_columns, ColumnRole, ColumnRule, TableColumns, COLUMN_RULES};
pub use error::{Result, WikipediaError};
pub use parser::{extract_page_title, extract_track_section, parse_page, parse_track_table};
