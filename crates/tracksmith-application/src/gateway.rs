// SPDX-License-Identifier: GPL-3.0-or-later

//! Per-source fetch lifecycle.
//!
//! A gateway runs at most one request at a time. Starting a new request, or
//! calling [`SourceGateway::cancel`], aborts the pending one and bumps a
//! generation counter. An event is only produced while the generation of its
//! request is still current, so a superseded request never reports.
//!
//! The state lock is never held while the sink runs, so a sink may call back
//! into its gateway (to cancel, or to start another request).

use crate::events::{EventSink, GatewayEvent};
use crate::sources::{
    MetadataSource, MusicBrainzSource, SourceError, SourcePayload, SourceRequest, WikipediaSource,
};
use anyhow::Context;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tracksmith_config::AppConfig;
use tracksmith_domain::{FetchStatus, SourceType};

#[derive(Default)]
struct GatewayState {
    generation: u64,
    status: FetchStatus,
    in_flight: Option<JoinHandle<()>>,
}

fn lock(state: &Mutex<GatewayState>) -> MutexGuard<'_, GatewayState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owns the fetch lifecycle of one metadata source.
pub struct SourceGateway {
    source: Arc<dyn MetadataSource>,
    sink: Arc<dyn EventSink>,
    state: Arc<Mutex<GatewayState>>,
}

impl SourceGateway {
    pub fn new(source: Arc<dyn MetadataSource>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            source,
            sink,
            state: Arc::new(Mutex::new(GatewayState::default())),
        }
    }

    pub fn name(&self) -> &'static str {
        self.source.name()
    }

    pub fn source_type(&self) -> SourceType {
        self.source.source_type()
    }

    pub fn supports_url_input(&self) -> bool {
        self.source.supports_url_input()
    }

    pub fn supports_search(&self) -> bool {
        self.source.supports_search()
    }

    pub fn is_valid_url(&self, input: &str) -> bool {
        self.source.is_valid_url(input)
    }

    pub fn status(&self) -> FetchStatus {
        lock(&self.state).status
    }

    pub fn is_fetching(&self) -> bool {
        self.status() == FetchStatus::Fetching
    }

    /// Fetch an album from a URL or identifier.
    ///
    /// Invalid input fails immediately (a `Failed` event is emitted and the
    /// error returned) without issuing a request. Must be called from within
    /// a tokio runtime.
    pub fn fetch_from_url(&self, input: &str) -> Result<(), SourceError> {
        let request = self.source.resolve_url(input);
        self.begin(request)
    }

    /// Search albums by artist and/or album name. Same failure rules as
    /// [`fetch_from_url`](Self::fetch_from_url).
    pub fn search_album(&self, artist: &str, album: &str) -> Result<(), SourceError> {
        let request = self.source.resolve_search(artist, album);
        self.begin(request)
    }

    /// Abort the pending request, if any. Its events are never delivered.
    pub fn cancel(&self) {
        let mut state = lock(&self.state);
        if invalidate(&mut state) {
            state.status = FetchStatus::Idle;
            debug!(target: "gateway", source = self.name(), "request cancelled");
        }
    }

    fn begin(&self, request: Result<SourceRequest, SourceError>) -> Result<(), SourceError> {
        let source_type = self.source_type();
        let mut state = lock(&self.state);

        if invalidate(&mut state) {
            debug!(target: "gateway", source = self.name(), "superseding pending request");
        }

        let request = match request {
            Ok(request) => request,
            Err(error) => {
                state.status = FetchStatus::Error;
                drop(state);
                warn!(target: "gateway", source = self.name(), %error, "request rejected");
                self.sink
                    .emit(source_type, GatewayEvent::Failed(error.to_string()));
                return Err(error);
            }
        };

        state.generation += 1;
        let generation = state.generation;
        state.status = FetchStatus::Fetching;
        drop(state);

        self.sink.emit(source_type, GatewayEvent::Started);
        info!(target: "gateway", source = self.name(), url = %request.url, "fetch started");

        let mut state = lock(&self.state);
        if state.generation != generation {
            // Cancelled or superseded from inside the sink.
            debug!(target: "gateway", source = self.name(), "request withdrawn before it was sent");
            return Ok(());
        }

        let run = RequestRun {
            source: Arc::clone(&self.source),
            sink: Arc::clone(&self.sink),
            state: Arc::clone(&self.state),
            generation,
        };
        state.in_flight = Some(tokio::spawn(run.execute(request)));
        Ok(())
    }
}

impl Drop for SourceGateway {
    fn drop(&mut self) {
        invalidate(&mut lock(&self.state));
    }
}

/// Abort the running task, if any, and retire the current generation.
/// Returns whether a request was pending.
fn invalidate(state: &mut GatewayState) -> bool {
    if let Some(handle) = state.in_flight.take() {
        handle.abort();
    }
    state.generation += 1;
    state.status == FetchStatus::Fetching
}

struct RequestRun {
    source: Arc<dyn MetadataSource>,
    sink: Arc<dyn EventSink>,
    state: Arc<Mutex<GatewayState>>,
    generation: u64,
}

impl RequestRun {
    async fn execute(self, request: SourceRequest) {
        let body = match self.source.fetch(&request).await {
            Ok(body) => body,
            Err(error) => {
                self.fail(error);
                return;
            }
        };

        if !self.deliver(GatewayEvent::Progress(50), None) {
            return;
        }

        match self.source.parse(&request, &body) {
            Ok(payload) => {
                if !self.deliver(GatewayEvent::Progress(100), None) {
                    return;
                }
                let event = match payload {
                    SourcePayload::Album(album) => {
                        info!(
                            target: "gateway",
                            source = self.source.name(),
                            album = %album.album,
                            tracks = album.tracks.len(),
                            "fetch completed"
                        );
                        GatewayEvent::Completed(album)
                    }
                    SourcePayload::SearchResults(albums) => {
                        info!(target: "gateway", source = self.source.name(), results = albums.len(), "search completed");
                        GatewayEvent::SearchResults(albums)
                    }
                };
                self.deliver(event, Some(FetchStatus::Success));
            }
            Err(error) => self.fail(error),
        }
    }

    fn fail(&self, error: SourceError) {
        warn!(target: "gateway", source = self.source.name(), %error, "fetch failed");
        self.deliver(GatewayEvent::Failed(error.to_string()), Some(FetchStatus::Error));
    }

    /// Emit `event` if this run is still current, settling the gateway first
    /// when `settle` is given. Returns false for a stale run.
    fn deliver(&self, event: GatewayEvent, settle: Option<FetchStatus>) -> bool {
        {
            let mut state = lock(&self.state);
            if state.generation != self.generation {
                debug!(target: "gateway", event = event.name(), "discarding event of stale request");
                return false;
            }
            if let Some(status) = settle {
                state.status = status;
                state.in_flight = None;
            }
        }

        self.sink.emit(self.source.source_type(), event);
        true
    }
}

/// Gateways keyed by source, plus the configured default source.
pub struct GatewaySet {
    gateways: HashMap<SourceType, SourceGateway>,
    default_source: SourceType,
}

impl GatewaySet {
    pub fn new(default_source: SourceType) -> Self {
        Self {
            gateways: HashMap::new(),
            default_source,
        }
    }

    /// Wikipedia and MusicBrainz gateways configured from `config`, reporting to `sink`.
    pub fn from_config(config: &AppConfig, sink: Arc<dyn EventSink>) -> anyhow::Result<Self> {
        let default_source = SourceType::parse(&config.sources.default_source).unwrap_or_else(|| {
            warn!(
                target: "gateway",
                value = %config.sources.default_source,
                "unknown default source, using wikipedia"
            );
            SourceType::Wikipedia
        });

        let wikipedia = WikipediaSource::from_config(&config.sources.wikipedia)
            .context("failed to build Wikipedia client")?;
        let musicbrainz = MusicBrainzSource::from_config(&config.sources.musicbrainz)
            .context("failed to build MusicBrainz client")?;

        let mut set = Self::new(default_source);
        set.register(SourceGateway::new(Arc::new(wikipedia), Arc::clone(&sink)));
        set.register(SourceGateway::new(Arc::new(musicbrainz), sink));
        Ok(set)
    }

    /// Add a gateway, replacing any previous one for the same source.
    pub fn register(&mut self, gateway: SourceGateway) {
        self.gateways.insert(gateway.source_type(), gateway);
    }

    pub fn get(&self, source: SourceType) -> Option<&SourceGateway> {
        self.gateways.get(&source)
    }

    pub fn default_source(&self) -> SourceType {
        self.default_source
    }

    pub fn default_gateway(&self) -> Option<&SourceGateway> {
        self.get(self.default_source)
    }

    /// Registered sources, in a stable order.
    pub fn sources(&self) -> Vec<SourceType> {
        let mut sources: Vec<SourceType> = self.gateways.keys().copied().collect();
        sources.sort_by_key(|source| source.as_str());
        sources
    }

    /// First registered source whose gateway accepts `input` as a URL or identifier.
    pub fn detect_source(&self, input: &str) -> Option<SourceType> {
        self.sources()
            .into_iter()
            .find(|source| self.gateways[source].is_valid_url(input))
    }

    pub fn cancel_all(&self) {
        for gateway in self.gateways.values() {
            gateway.cancel();
        }
    }
}
