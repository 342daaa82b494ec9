// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;
use tracksmith_application::{ChannelEventSink, GatewayEvent, GatewaySet, TrackMatcher};
use tracksmith_config::AppConfig;
use tracksmith_domain::{FetchStatus, LocalTrack, SourceType};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RELEASE_ID: &str = "0f5b4a2c-3a6e-4d0b-9a55-1c2d3e4f5a6b";

const SOUNDTRACK_PAGE: &str = r#"<html><head><title>Roja (film) - Wikipedia</title></head><body>
<h2 id="Plot">Plot</h2><p>Story.</p>
<h2 id="Soundtrack">Soundtrack</h2>
<table class="wikitable tracklist">
<tr><th>No.</th><th>Title</th><th>Singer(s)</th><th>Length</th></tr>
<tr><td>1.</td><td>"Kadhal Rojave"</td><td>S. P. Balasubrahmanyam</td><td>4:54</td></tr>
<tr><td>2.</td><td>"Chinna Chinna Aasai"</td><td>Minmini</td><td>4:53</td></tr>
</table>
<h2 id="Reception">Reception</h2>
</body></html>"#;

fn config_for(server: &MockServer) -> AppConfig {
    let mut config = AppConfig::default();
    config.sources.wikipedia.base_url = Some(server.uri());
    config.sources.musicbrainz.base_url = Some(server.uri());
    config.sources.musicbrainz.rate_limit_ms = 1;
    config
}

fn gateways_for(server: &MockServer) -> (GatewaySet, UnboundedReceiver<(SourceType, GatewayEvent)>) {
    let (sink, events) = ChannelEventSink::new();
    let gateways = GatewaySet::from_config(&config_for(server), Arc::new(sink)).unwrap();
    (gateways, events)
}

/// Collect events up to and including the first terminal one.
async fn until_terminal(events: &mut UnboundedReceiver<(SourceType, GatewayEvent)>) -> Vec<GatewayEvent> {
    let mut seen = Vec::new();
    loop {
        let (_, event) = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("terminal event should arrive")
            .expect("event channel should stay open");
        let terminal = event.is_terminal();
        seen.push(event);
        if terminal {
            return seen;
        }
    }
}

fn release_body() -> serde_json::Value {
    json!({
        "id": RELEASE_ID,
        "title": "Roja",
        "date": "1992-08-15",
        "country": "IN",
        "artist-credit": [{"name": "A. R. Rahman", "artist": {"id": "a1", "name": "A. R. Rahman"}}],
        "media": [{
            "position": 1,
            "format": "CD",
            "tracks": [
                {"id": "t1", "position": 1, "title": "Kadhal Rojave", "length": 294000,
                 "recording": {"id": "r1", "title": "Kadhal Rojave"}},
                {"id": "t2", "position": 2, "title": "Chinna Chinna Aasai", "length": 293000,
                 "recording": {"id": "r2", "title": "Chinna Chinna Aasai"}}
            ]
        }]
    })
}

#[tokio::test]
async fn test_wikipedia_fetch_completes_with_album() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wiki/Roja_(film)"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SOUNDTRACK_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let (gateways, mut events) = gateways_for(&server);
    let gateway = gateways.get(SourceType::Wikipedia).unwrap();

    gateway
        .fetch_from_url("https://en.wikipedia.org/wiki/Roja_(film)")
        .unwrap();

    let seen = until_terminal(&mut events).await;
    assert_eq!(seen[0], GatewayEvent::Started);
    assert!(seen.contains(&GatewayEvent::Progress(100)));

    let Some(GatewayEvent::Completed(album)) = seen.last() else {
        panic!("expected completion, got {seen:?}");
    };
    assert_eq!(album.album, "Roja");
    assert_eq!(album.source, SourceType::Wikipedia);
    assert_eq!(album.tracks.len(), 2);
    assert_eq!(album.tracks[0].title, "Kadhal Rojave");
    assert_eq!(album.tracks[1].duration_seconds, 293);
    assert_eq!(gateway.status(), FetchStatus::Success);
}

#[tokio::test]
async fn test_wikipedia_page_without_tracks_fails() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wiki/Empty"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<title>Empty - Wikipedia</title>"))
        .mount(&server)
        .await;

    let (gateways, mut events) = gateways_for(&server);
    let gateway = gateways.get(SourceType::Wikipedia).unwrap();
    gateway.fetch_from_url("https://en.wikipedia.org/wiki/Empty").unwrap();

    let seen = until_terminal(&mut events).await;
    assert_eq!(
        seen.last(),
        Some(&GatewayEvent::Failed("No soundtrack table found on the page".to_string()))
    );
    assert_eq!(gateway.status(), FetchStatus::Error);
}

#[tokio::test]
async fn test_musicbrainz_release_fetch_and_match() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/release/{RELEASE_ID}")))
        .and(query_param("fmt", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(release_body()))
        .expect(1)
        .mount(&server)
        .await;

    let (gateways, mut events) = gateways_for(&server);
    let gateway = gateways.get(SourceType::MusicBrainz).unwrap();

    gateway
        .fetch_from_url(&format!("https://musicbrainz.org/release/{RELEASE_ID}"))
        .unwrap();

    let seen = until_terminal(&mut events).await;
    let Some(GatewayEvent::Completed(album)) = seen.last() else {
        panic!("expected completion, got {seen:?}");
    };
    assert_eq!(album.album, "Roja");
    assert_eq!(album.album_artist, "A. R. Rahman");
    assert_eq!(album.year, 1992);
    assert_eq!(album.release_id, RELEASE_ID);

    let locals = vec![
        LocalTrack::new("/music/02.mp3", "chinna chinna aasai").with_duration_ms(293_500),
        LocalTrack::new("/music/01.mp3", "Kadhal Rojave (Remastered)"),
    ];
    let results = TrackMatcher::default().match_tracks(&locals, album);
    assert_eq!(results[0].metadata_index, Some(1));
    assert!(results[0].is_high_confidence());
    assert_eq!(results[1].metadata_index, Some(0));
    assert_eq!(results[1].reason, "Partial title match");
}

#[tokio::test]
async fn test_musicbrainz_search_reports_results() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/release"))
        .and(query_param("query", r#"artist:"A. R. Rahman" AND release:"Roja""#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1,
            "offset": 0,
            "releases": [release_body()]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (gateways, mut events) = gateways_for(&server);
    let gateway = gateways.get(SourceType::MusicBrainz).unwrap();
    gateway.search_album("A. R. Rahman", "Roja").unwrap();

    let seen = until_terminal(&mut events).await;
    let Some(GatewayEvent::SearchResults(results)) = seen.last() else {
        panic!("expected search results, got {seen:?}");
    };
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].album, "Roja");
    assert_eq!(gateway.status(), FetchStatus::Success);
}

#[tokio::test]
async fn test_musicbrainz_http_error_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/release/{RELEASE_ID}")))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let (gateways, mut events) = gateways_for(&server);
    let gateway = gateways.get(SourceType::MusicBrainz).unwrap();
    gateway.fetch_from_url(RELEASE_ID).unwrap();

    let seen = until_terminal(&mut events).await;
    let Some(GatewayEvent::Failed(message)) = seen.last() else {
        panic!("expected failure, got {seen:?}");
    };
    assert!(message.starts_with("Failed to fetch release: "), "{message}");
    assert_eq!(gateway.status(), FetchStatus::Error);
}

#[tokio::test]
async fn test_cancelled_request_never_reports() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wiki/Slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(SOUNDTRACK_PAGE)
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let (gateways, mut events) = gateways_for(&server);
    let gateway = gateways.get(SourceType::Wikipedia).unwrap();
    gateway.fetch_from_url("https://en.wikipedia.org/wiki/Slow").unwrap();

    let (_, started) = events.recv().await.unwrap();
    assert_eq!(started, GatewayEvent::Started);

    gateways.cancel_all();
    assert_eq!(gateway.status(), FetchStatus::Idle);

    tokio::time::sleep(Duration::from_millis(800)).await;
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_superseded_request_is_discarded() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wiki/Slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<title>Slow - Wikipedia</title>")
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wiki/Roja_(film)"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SOUNDTRACK_PAGE))
        .mount(&server)
        .await;

    let (gateways, mut events) = gateways_for(&server);
    let gateway = gateways.get(SourceType::Wikipedia).unwrap();
    gateway.fetch_from_url("https://en.wikipedia.org/wiki/Slow").unwrap();
    gateway
        .fetch_from_url("https://en.wikipedia.org/wiki/Roja_(film)")
        .unwrap();

    let seen = until_terminal(&mut events).await;
    let Some(GatewayEvent::Completed(album)) = seen.last() else {
        panic!("expected completion, got {seen:?}");
    };
    assert_eq!(album.album, "Roja");

    tokio::time::sleep(Duration::from_millis(800)).await;
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_invalid_input_fails_without_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (gateways, mut events) = gateways_for(&server);
    let gateway = gateways.get(SourceType::Wikipedia).unwrap();

    assert!(gateway.fetch_from_url("https://example.com/wiki/X").is_err());
    let (source, event) = events.recv().await.unwrap();
    assert_eq!(source, SourceType::Wikipedia);
    assert_eq!(event, GatewayEvent::Failed("Invalid Wikipedia URL".to_string()));
    assert_eq!(gateway.status(), FetchStatus::Error);
}

#[tokio::test]
async fn test_detect_source_routes_by_input() {
    let server = MockServer::start().await;
    let (gateways, _events) = gateways_for(&server);

    assert_eq!(
        gateways.detect_source("https://ta.wikipedia.org/wiki/Roja"),
        Some(SourceType::Wikipedia)
    );
    assert_eq!(gateways.detect_source(RELEASE_ID), Some(SourceType::MusicBrainz));
    assert_eq!(gateways.detect_source("hello"), None);
    assert_eq!(gateways.default_source(), SourceType::Wikipedia);
}
