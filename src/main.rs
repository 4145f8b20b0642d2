//! Quakelens - earthquake map dashboard over the USGS live feed.
//!
//! Serves an interactive map of the last 24 hours of earthquakes, with a
//! magnitude filter, summary statistics and event details. The same core
//! also backs one-shot terminal commands.

use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;

mod cli;
mod client;
mod dashboard;
mod derive;
mod errors;
mod feed;
mod filters;
mod map;
mod models;
mod output;
mod scene;
mod selection;
mod server;

use cli::{Cli, Command, SourceArgs};
use client::UsgsClient;
use derive::compute_stats;
use models::{EarthquakeEvent, FeedSnapshot};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    let client = build_client(&cli.source)?;
    match cli.command {
        Command::Tail(args) => cmd_tail(&client, &args),
        Command::Stats(args) => cmd_stats(&client, &args),
        Command::Ui(args) => cmd_ui(client, args),
    }
}

/// Initialize tracing subscriber.
fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn build_client(source: &SourceArgs) -> Result<UsgsClient> {
    let client = match &source.feed_url {
        Some(url) => UsgsClient::with_url(url.clone()),
        None => UsgsClient::new(source.feed),
    };
    client.context("failed to create USGS client")
}

/// Fetch one snapshot on a short-lived runtime.
fn fetch_once(client: &UsgsClient) -> Result<FeedSnapshot> {
    tokio::runtime::Runtime::new()
        .context("failed to create tokio runtime")?
        .block_on(client.fetch_feed())
        .context("failed to fetch earthquake feed")
}

/// Execute the `tail` command - one-shot fetch of recent earthquakes.
fn cmd_tail(client: &UsgsClient, args: &cli::TailArgs) -> Result<()> {
    let snapshot = fetch_once(client)?;
    if snapshot.is_empty() {
        tracing::info!("feed contains no events");
    }

    let mut events: Vec<&EarthquakeEvent> = snapshot
        .events
        .iter()
        .filter(|e| args.min_magnitude.matches(e))
        .map(|e| &**e)
        .collect();

    // Most recent first
    events.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
    events.truncate(args.limit);

    tracing::debug!(
        shown = events.len(),
        total = snapshot.len(),
        threshold = %args.min_magnitude,
        "filtered feed"
    );

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_events(&mut handle, &events, args.format)?;

    Ok(())
}

/// Execute the `stats` command - summary of the whole feed.
fn cmd_stats(client: &UsgsClient, args: &cli::StatsArgs) -> Result<()> {
    let snapshot = fetch_once(client)?;
    let stats = compute_stats(Some(&snapshot)).context("feed produced no statistics")?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_stats(&mut handle, &stats, args.format)?;

    Ok(())
}

/// Execute the `ui` command - start the dashboard server.
fn cmd_ui(client: UsgsClient, args: cli::UiArgs) -> Result<()> {
    let config = server::ServerConfig {
        port: args.port,
        host: args.host,
        ..server::ServerConfig::default()
    };

    let url = format!("http://{}:{}", config.host, config.port);
    println!("\x1b[1m🌍 Quakelens\x1b[0m");
    println!("\x1b[2m───────────────────────────────────────\x1b[0m");
    println!("  Local:   \x1b[96m{url}\x1b[0m");
    println!("  Feed:    {}", client.url());
    println!("\x1b[2m───────────────────────────────────────\x1b[0m");
    println!("\x1b[2mPress Ctrl+C to stop\x1b[0m\n");

    if args.open {
        open_browser(&url);
    }

    tokio::runtime::Runtime::new()
        .context("failed to create tokio runtime")?
        .block_on(server::run_server(config, client))
}

/// Best effort; a missing opener only costs a warning.
fn open_browser(url: &str) {
    #[cfg(target_os = "macos")]
    let result = std::process::Command::new("open").arg(url).spawn();
    #[cfg(target_os = "windows")]
    let result = std::process::Command::new("cmd")
        .args(["/c", "start", url])
        .spawn();
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let result = std::process::Command::new("xdg-open").arg(url).spawn();

    if let Err(e) = result {
        tracing::warn!("failed to open browser: {}", e);
    }
}
