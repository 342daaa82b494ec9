// SPDX-License-Identifier: GPL-3.0-or-later
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::trace;
use tracksmith_domain::{AlbumMetadata, SourceType};

/// Observable gateway lifecycle events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum GatewayEvent {
    Started,
    /// Coarse milestones: 50 once bytes arrived, 100 once parsed.
    Progress(u8),
    Completed(AlbumMetadata),
    Failed(String),
    SearchResults(Vec<AlbumMetadata>),
}

impl GatewayEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Started => "fetch.started",
            Self::Progress(_) => "fetch.progress",
            Self::Completed(_) => "fetch.completed",
            Self::Failed(_) => "fetch.failed",
            Self::SearchResults(_) => "fetch.search_results",
        }
    }

    /// True for the event that settles a request.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed(_) | Self::Failed(_) | Self::SearchResults(_)
        )
    }
}

/// Receiver of gateway events.
///
/// Called without the gateway's state lock held; implementations may call
/// back into the emitting gateway. Staleness is decided when the event is
/// produced, so a request cancelled concurrently with an emit can still
/// report that one event.
pub trait EventSink: Send + Sync {
    fn emit(&self, source: SourceType, event: GatewayEvent);
}

/// An event captured by [`InMemoryEventBus`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedEvent {
    pub source: SourceType,
    pub occurred_at: DateTime<Utc>,
    pub event: GatewayEvent,
}

/// A minimal in-memory event bus that keeps every emitted event.
#[derive(Clone, Default)]
pub struct InMemoryEventBus {
    inner: Arc<Mutex<Vec<RecordedEvent>>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the captured events, oldest first.
    pub fn events(&self) -> Vec<GatewayEvent> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|recorded| recorded.event.clone())
            .collect()
    }

    /// Retrieve and clear all captured events
    pub fn drain(&self) -> Vec<RecordedEvent> {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *guard)
    }
}

impl EventSink for InMemoryEventBus {
    fn emit(&self, source: SourceType, event: GatewayEvent) {
        trace!(target: "gateway", source = %source, event = event.name(), "event recorded");
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedEvent {
                source,
                occurred_at: Utc::now(),
                event,
            });
    }
}

/// Forwards events into an unbounded tokio channel.
#[derive(Clone)]
pub struct ChannelEventSink {
    sender: mpsc::UnboundedSender<(SourceType, GatewayEvent)>,
}

impl ChannelEventSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(SourceType, GatewayEvent)>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, source: SourceType, event: GatewayEvent) {
        if self.sender.send((source, event)).is_err() {
            trace!(target: "gateway", source = %source, "event receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_and_drain_events() {
        let bus = InMemoryEventBus::new();
        assert!(bus.is_empty());

        bus.emit(SourceType::Wikipedia, GatewayEvent::Started);
        bus.emit(SourceType::Wikipedia, GatewayEvent::Failed("Invalid Wikipedia URL".into()));
        assert_eq!(bus.len(), 2);

        let drained = bus.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].event, GatewayEvent::Started);
        assert_eq!(drained[1].source, SourceType::Wikipedia);
        assert!(drained[0].occurred_at <= drained[1].occurred_at);
        assert!(bus.is_empty());
    }

    #[test]
    fn events_serialize_with_tag() {
        let value = serde_json::to_value(GatewayEvent::Progress(50)).unwrap();
        assert_eq!(value["event"], "progress");
        assert_eq!(value["payload"], 50);
    }

    #[test]
    fn terminal_events() {
        assert!(!GatewayEvent::Started.is_terminal());
        assert!(!GatewayEvent::Progress(100).is_terminal());
        assert!(GatewayEvent::Failed(String::new()).is_terminal());
        assert!(GatewayEvent::SearchResults(Vec::new()).is_terminal());
        assert!(GatewayEvent::Completed(AlbumMetadata::default()).is_terminal());
    }

    #[tokio::test]
    async fn channel_sink_forwards_events() {
        let (sink, mut receiver) = ChannelEventSink::new();
        sink.emit(SourceType::MusicBrainz, GatewayEvent::Progress(50));

        let (source, event) = receiver.recv().await.unwrap();
        assert_eq!(source, SourceType::MusicBrainz);
        assert_eq!(event, GatewayEvent::Progress(50));
    }

    #[test]
    fn channel_sink_ignores_dropped_receiver() {
        let (sink, receiver) = ChannelEventSink::new();
        drop(receiver);
        sink.emit(SourceType::Wikipedia, GatewayEvent::Started);
    }
}
