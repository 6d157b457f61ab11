//! # Freight Atlas
//!
//! A logistics news map: pulls a fixed catalog of industry feeds, keeps the
//! entries about ports, terminals and supply chains, finds the places they
//! mention, geocodes them and maintains a filterable set of map markers.
//!
//! ## Features
//!
//! - Fetches up to 15 feeds concurrently through a feed-to-JSON service
//! - Extracts place names from titles and descriptions heuristically
//! - Geocodes each place and keeps the most important match per entry
//! - Filters markers by country and recency (day, month, year)
//! - Renders as standard, dark, satellite or heatmap
//! - Writes the current map state as JSON for the front-end page
//!
//! ## Usage
//!
//! ```sh
//! freight_atlas -o ./site/data
//! freight_atlas -o ./site/data --once --theme heatmap
//! ```
//!
//! Send `SIGHUP` to start a refresh immediately. User actions (filters,
//! theme, focus, routes) are read from stdin one per line; see [`commands`].
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Fetching**: Retrieve every feed and keep relevant entries (concurrent)
//! 2. **Extraction**: Find candidate place names in each entry
//! 3. **Geocoding**: Resolve candidates one request at a time, best match wins
//! 4. **Indexing**: Rebuild markers, re-apply filters and write a snapshot
//!
//! Cycles repeat every six hours; see [`scheduler`].

use clap::Parser;
use futures::stream::{self, Stream, StreamExt};
use std::error::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod commands;
mod config;
mod error;
mod extract;
mod feeds;
mod filter;
mod geocode;
mod index;
mod models;
mod outputs;
mod pipeline;
mod routes;
mod scheduler;
mod sources;
mod utils;

use cli::Cli;
use commands::Command;
use config::Config;
use feeds::rss2json::Rss2JsonClient;
use filter::FilterEngine;
use geocode::{NominatimGeocoder, Throttled};
use models::{FilterCriteria, RenderMode, TimeWindow};
use pipeline::Pipeline;
use scheduler::RefreshScheduler;
use utils::ensure_writable_dir;

#[tokio::main(flavor = "current_thread")]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("freight_atlas starting up");

    let args = Cli::parse();
    let config = Config::load(&args).await?;
    info!(
        feed_endpoint = %config.feed_endpoint,
        geocode_endpoint = %config.geocode_endpoint,
        refresh_secs = config.refresh_interval_secs,
        "Configuration resolved"
    );

    // Early check: ensure output dir is writable
    if let Some(dir) = &args.output_dir {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(
                path = %dir,
                error = %e,
                "Output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }

    let mode: RenderMode = args.theme.parse()?;
    let criteria = FilterCriteria::new(&args.country, TimeWindow::from_str_lossy(&args.window));
    info!(country = %criteria.country, window = ?criteria.time_window, %mode, "Initial view");

    let http = reqwest::Client::builder().user_agent(&config.user_agent).build()?;
    let feeds = Rss2JsonClient::new(http.clone(), config.feed_endpoint.clone());
    let geocoder = Throttled::new(
        NominatimGeocoder::new(http, config.geocode_endpoint.clone()),
        config.geocode_min_interval(),
        config.geocode_jitter(),
    );
    let pipeline = Pipeline::new(
        feeds,
        geocoder,
        sources::sources().to_vec(),
        FilterEngine::new(criteria, mode),
    );
    let scheduler = RefreshScheduler::new(config.refresh_interval(), args.output_dir.clone());

    if args.once {
        let outcome = scheduler.run_once(&pipeline).await;
        info!(?outcome, "Single cycle finished");
    } else {
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Cannot listen for Ctrl-C; stopping");
            }
        };
        let commands = stream::select(
            manual_triggers()?.map(|()| Command::Refresh),
            commands::parse_lines(stdin_lines()),
        );
        scheduler.run(&pipeline, commands, shutdown).await;
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}

/// One item per `SIGHUP`.
#[cfg(unix)]
fn manual_triggers() -> std::io::Result<impl Stream<Item = ()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let hangup = signal(SignalKind::hangup())?;
    Ok(stream::unfold(hangup, |mut hangup| async move {
        hangup.recv().await.map(|()| ((), hangup))
    }))
}

#[cfg(not(unix))]
fn manual_triggers() -> std::io::Result<impl Stream<Item = ()>> {
    Ok(stream::pending())
}

/// Lines typed on stdin; ends at EOF or on a read error.
fn stdin_lines() -> impl Stream<Item = String> {
    let lines = BufReader::new(tokio::io::stdin()).lines();
    stream::unfold(lines, |mut lines| async move {
        match lines.next_line().await {
            Ok(Some(line)) => Some((line, lines)),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Stopped reading commands from stdin");
                None
            }
        }
    })
}
