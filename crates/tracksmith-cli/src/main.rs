// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};
use tracksmith_application::{
    clamp_threshold, AppState, ChannelEventSink, GatewayEvent, GatewaySet, MatchSummary, SourceGateway,
    TrackMatcher,
};
use tracksmith_config::load as load_config;
use tracksmith_domain::{AlbumMetadata, ConfidenceBand, LocalTrack, SourceType};

/// Fetch canonical album metadata and match it against local tracks
#[derive(Debug, Parser)]
#[command(name = "tracksmith", author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true, env = "TRACKSMITH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch an album from a Wikipedia URL or a MusicBrainz URL/ID
    Fetch {
        /// Article URL, release or release-group URL, or bare MBID
        input: String,
        /// Source to use (detected from the input when omitted)
        #[arg(short, long, value_parser = parse_source)]
        source: Option<SourceType>,
        /// JSON array of local tracks to match against the fetched album
        #[arg(short, long)]
        tracks: Option<PathBuf>,
    },
    /// Search albums by artist and/or album name
    Search {
        #[arg(long, default_value = "")]
        artist: String,
        #[arg(long, default_value = "")]
        album: String,
        #[arg(short, long, value_parser = parse_source, default_value = "musicbrainz")]
        source: SourceType,
    },
}

fn parse_source(value: &str) -> std::result::Result<SourceType, String> {
    SourceType::parse(value).ok_or_else(|| format!("unknown source '{value}'"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = init_tracing();
    let config = load_config(cli.config.as_deref())?;
    apply_log_level(&log_filter, &config.telemetry.log_level);

    let state = AppState::new(config);
    state.on_start();

    let (sink, mut events) = ChannelEventSink::new();
    let gateways = GatewaySet::from_config(&state.config, Arc::new(sink))?;

    match cli.command {
        Command::Fetch { input, source, tracks } => {
            let source = source
                .or_else(|| gateways.detect_source(&input))
                .unwrap_or_else(|| gateways.default_source());
            let gateway = gateway_for(&gateways, source)?;
            info!(target: "cli", source = %source, %input, "fetching album");

            gateway.fetch_from_url(&input)?;
            let Some(album) = wait_for_album(&mut events, &gateways).await? else {
                return Ok(());
            };

            print_album(&album);
            if let Some(path) = tracks {
                let local_tracks = read_local_tracks(&path)?;
                print_matches(&state, &album, &local_tracks);
            }
        }
        Command::Search { artist, album, source } => {
            let gateway = gateway_for(&gateways, source)?;
            if !gateway.supports_search() {
                bail!("{} does not support search", gateway.name());
            }
            info!(target: "cli", source = %source, %artist, %album, "searching albums");

            gateway.search_album(&artist, &album)?;
            if let Some(results) = wait_for_search(&mut events, &gateways).await? {
                print_search_results(&results);
            }
        }
    }

    Ok(())
}

type LogFilterHandle = reload::Handle<EnvFilter, Registry>;

/// Install logging filtered by `RUST_LOG` (or `info`), before configuration
/// is loaded so that loading itself is logged.
fn init_tracing() -> LogFilterHandle {
    let fmt_layer = fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
    handle
}

/// Filter for the configured level. `RUST_LOG` takes precedence, so there is
/// none while it is set.
fn configured_filter(rust_log_set: bool, level: &str) -> Result<Option<EnvFilter>> {
    if rust_log_set {
        return Ok(None);
    }
    let filter = EnvFilter::try_new(level)
        .with_context(|| format!("invalid telemetry.log_level '{level}'"))?;
    Ok(Some(filter))
}

fn apply_log_level(handle: &LogFilterHandle, level: &str) {
    let rust_log_set = std::env::var_os(EnvFilter::DEFAULT_ENV).is_some();
    match configured_filter(rust_log_set, level) {
        Ok(Some(filter)) => {
            if let Err(error) = handle.reload(filter) {
                warn!(target: "cli", %error, "failed to apply configured log level");
            }
        }
        Ok(None) => {}
        Err(error) => warn!(target: "cli", "{error:#}, keeping info"),
    }
}

fn gateway_for(gateways: &GatewaySet, source: SourceType) -> Result<&SourceGateway> {
    gateways
        .get(source)
        .ok_or_else(|| anyhow!("{source} is not available"))
}

/// Next terminal event, or `None` when interrupted.
async fn next_outcome(
    events: &mut UnboundedReceiver<(SourceType, GatewayEvent)>,
    gateways: &GatewaySet,
) -> Result<Option<GatewayEvent>> {
    let outcome = async {
        while let Some((source, event)) = events.recv().await {
            match event {
                GatewayEvent::Progress(percent) => {
                    info!(target: "cli", source = %source, percent, "progress")
                }
                event if event.is_terminal() => return Some(event),
                _ => {}
            }
        }
        None
    };

    tokio::select! {
        event = outcome => event.map(Some).ok_or_else(|| anyhow!("event channel closed")),
        _ = tokio::signal::ctrl_c() => {
            gateways.cancel_all();
            warn!(target: "cli", "interrupted, request cancelled");
            Ok(None)
        }
    }
}

async fn wait_for_album(
    events: &mut UnboundedReceiver<(SourceType, GatewayEvent)>,
    gateways: &GatewaySet,
) -> Result<Option<AlbumMetadata>> {
    match next_outcome(events, gateways).await? {
        Some(GatewayEvent::Completed(album)) => Ok(Some(album)),
        Some(GatewayEvent::Failed(message)) => Err(anyhow!(message)),
        Some(other) => Err(anyhow!("unexpected event {}", other.name())),
        None => Ok(None),
    }
}

async fn wait_for_search(
    events: &mut UnboundedReceiver<(SourceType, GatewayEvent)>,
    gateways: &GatewaySet,
) -> Result<Option<Vec<AlbumMetadata>>> {
    match next_outcome(events, gateways).await? {
        Some(GatewayEvent::SearchResults(results)) => Ok(Some(results)),
        Some(GatewayEvent::Failed(message)) => Err(anyhow!(message)),
        Some(other) => Err(anyhow!("unexpected event {}", other.name())),
        None => Ok(None),
    }
}

fn read_local_tracks(path: &Path) -> Result<Vec<LocalTrack>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn band_label(band: ConfidenceBand) -> &'static str {
    match band {
        ConfidenceBand::High => "high",
        ConfidenceBand::Medium => "medium",
        ConfidenceBand::Low => "low",
        ConfidenceBand::None => "none",
    }
}

fn print_album(album: &AlbumMetadata) {
    println!("{}", album.album);
    if !album.album_artist.is_empty() {
        println!("  artist:   {}", album.album_artist);
    }
    if !album.music_director.is_empty() {
        println!("  music:    {}", album.music_director);
    }
    if album.year > 0 {
        println!("  year:     {}", album.year);
    }
    println!("  source:   {} ({})", album.source, album.source_url);

    for track in &album.tracks {
        let artist = if track.artist.is_empty() {
            String::new()
        } else {
            format!(" - {}", track.artist)
        };
        println!(
            "  {:>2}/{} {:>3}. {}{} [{}]",
            track.disc_number,
            track.total_discs,
            track.track_number,
            track.title,
            artist,
            track.formatted_duration()
        );
    }
}

fn print_search_results(results: &[AlbumMetadata]) {
    if results.is_empty() {
        println!("No releases found");
        return;
    }
    for (index, album) in results.iter().enumerate() {
        println!(
            "{:>3}. {} - {} ({}) [{} tracks] {}",
            index + 1,
            album.album,
            album.album_artist,
            album.year,
            album.track_count(),
            album.source_url
        );
    }
}

fn print_matches(state: &AppState, album: &AlbumMetadata, local_tracks: &[LocalTrack]) {
    let threshold = clamp_threshold(
        "confidence_threshold",
        state.config.matching.confidence_threshold,
        0.6,
    );
    let results = TrackMatcher::new(state.match_options()).match_tracks(local_tracks, album);

    println!();
    for result in &results {
        if !result.is_valid() {
            println!("  {:<40} -> (no match)", result.target_title);
            continue;
        }
        let review = if result.meets_threshold(threshold) { "" } else { " [review]" };
        println!(
            "  {:<40} -> {} ({:.2}, {}, {}){}",
            result.target_title,
            result.source_metadata.title,
            result.confidence,
            band_label(result.band()),
            result.reason,
            review
        );
    }

    let summary = MatchSummary::new(album, &results, threshold);
    println!("{}", summary.status_line());
}
