// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::Path;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Minimum confidence (0.0-1.0) for a proposed match to be accepted without review.
    pub confidence_threshold: f32,
    /// Widest duration difference, in seconds, that still earns a duration bonus.
    pub duration_tolerance_secs: u32,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.6,
            duration_tolerance_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusicBrainzConfig {
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub rate_limit_ms: u64,
    pub search_limit: u32,
}

impl Default for MusicBrainzConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 30,
            rate_limit_ms: 1000,
            search_limit: 25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikipediaConfig {
    /// Overrides scheme and host of requested article URLs.
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_concurrent_requests: usize,
}

impl Default for WikipediaConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 30,
            max_concurrent_requests: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    pub default_source: String,
    pub musicbrainz: MusicBrainzConfig,
    pub wikipedia: WikipediaConfig,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            default_source: "wikipedia".to_string(),
            musicbrainz: MusicBrainzConfig::default(),
            wikipedia: WikipediaConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub matching: MatchingConfig,
    pub sources: SourcesConfig,
    pub telemetry: TelemetryConfig,
}

/// Load configuration from defaults, optional TOML file, and environment overrides (prefix: TRACKSMITH_).
pub fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("TRACKSMITH_").split("__"));

    let config: AppConfig = figment.extract()?;
    info!(target: "config", "configuration loaded");
    Ok(config)
}
