//! Command-line interface definitions.
//!
//! Uses clap derive API for argument parsing.

use clap::{Args, Parser, Subcommand};

use crate::client::FeedType;
use crate::filters::MagnitudeThreshold;
use crate::output::Format;

/// Earthquake map dashboard over the USGS live feed.
#[derive(Parser, Debug)]
#[command(name = "quakelens")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    pub quiet: bool,

    #[command(flatten)]
    pub source: SourceArgs,
}

/// Where the feed is fetched from.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// USGS summary feed to use
    #[arg(long, global = true, default_value = "all_day", value_parser = parse_feed_type)]
    pub feed: FeedType,

    /// Fetch from this URL instead of the USGS summary feed
    #[arg(long, global = true)]
    pub feed_url: Option<String>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show recent earthquakes (one-shot fetch and exit)
    Tail(TailArgs),

    /// Print feed statistics (one-shot fetch and exit)
    Stats(StatsArgs),

    /// Start the map dashboard
    Ui(UiArgs),
}

/// Arguments for the `tail` command.
#[derive(Parser, Debug)]
pub struct TailArgs {
    /// Minimum magnitude to show (0 to 8, in steps of 0.5)
    #[arg(long, default_value = "2.5", value_parser = parse_threshold)]
    pub min_magnitude: MagnitudeThreshold,

    /// Maximum number of events to show
    #[arg(long, short = 'n', default_value = "50")]
    pub limit: usize,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for the `stats` command.
#[derive(Parser, Debug)]
pub struct StatsArgs {
    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for the `ui` command.
#[derive(Parser, Debug)]
pub struct UiArgs {
    /// Port to listen on
    #[arg(long, short = 'p', default_value = "8080")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Open browser automatically
    #[arg(long)]
    pub open: bool,
}

/// Parse a feed type from string.
fn parse_feed_type(s: &str) -> Result<FeedType, String> {
    s.parse()
}

/// Parse an output format from string.
fn parse_format(s: &str) -> Result<Format, String> {
    s.parse()
}

/// Parse a magnitude threshold from string.
fn parse_threshold(s: &str) -> Result<MagnitudeThreshold, String> {
    s.parse()
}
