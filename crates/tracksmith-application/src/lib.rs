// SPDX-License-Identifier: GPL-3.0-or-later
use tracksmith_config::AppConfig;
pub mod events;
pub mod gateway;
pub mod manual;
pub mod matching;
pub mod sources;

pub use events::{ChannelEventSink, EventSink, GatewayEvent, InMemoryEventBus, RecordedEvent};
pub use gateway::{GatewaySet, SourceGateway};
pub use manual::{ManualMatchError, ManualMatchSession, SessionStatus, Side};
pub use matching::{clamp_threshold, MatchOptions, MatchSummary, PairScore, TrackMatcher, ACCEPTANCE_THRESHOLD};
pub use sources::{
    MetadataSource, MusicBrainzSource, RequestIntent, SourceError, SourcePayload, SourceRequest, SourceResult,
    WikipediaSource,
};

use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn match_options(&self) -> MatchOptions {
        MatchOptions::from(&self.config.matching)
    }

    pub fn on_start(&self) {
        info!(
            target: "application",
            default_source = %self.config.sources.default_source,
            "application state initialized"
        );
    }
}
