// SPDX-License-Identifier: Apache-2.0 OR MIT
// SPDX-FileCopyrightText: 2025 alb-replay contributors
//
//! CLI that replays ALB access logs against a target host.
//!
//! Examples:
//! ```bash
//! alb-replay -H http://localhost:8080                          # timing-faithful replay of ./data
//! alb-replay -H http://localhost:8080 --use-tx-time false      # one request per second
//! alb-replay -H https://staging.internal --prefix /api --http-method get --max-pings 500
//! alb-replay -H http://localhost:8080 --protocol h2 --dry-run | head
//! ```

use anyhow::{anyhow, Result};
use clap::{ArgAction, Parser};
use std::io::{self, ErrorKind, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use alb_replay::constants::{DEFAULT_DATA_DIR, DEFAULT_FIXED_INTERVAL_MS};
use alb_replay::{
    load_directory, parse_url_host, replay_timeline, report, HttpClientConfig, HttpTransport,
    PacingMode, Protocol, RecordFilter, ReplayConfig, Timeline, TransportError,
};

/// Anything other than the literal "false" turns timing-faithful mode on.
fn parse_use_tx_time(s: &str) -> Result<bool, String> {
    Ok(s != "false")
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Replay recorded ALB traffic against a target host")]
struct Cli {
    /// Turn on verbose logging, counts the number of v's
    #[arg(short = 'v',
        long,
        action = ArgAction::Count,
        help = "Increase log verbosity: -v = Info, -vv = Debug",
    )]
    verbose: u8,

    /// Scheme and host every request is sent to, e.g. http://localhost:8080
    #[arg(short = 'H', long = "url-host", env = "ALB_REPLAY_URL_HOST")]
    url_host: String,

    /// Only replay requests recorded with this HTTP method
    #[arg(long = "http-method", value_name = "METHOD")]
    http_method: Option<String>,

    /// Only replay records of this protocol type
    #[arg(long, value_enum)]
    protocol: Option<Protocol>,

    /// Only replay requests whose path starts with this prefix
    #[arg(long, value_name = "PATH")]
    prefix: Option<String>,

    /// Stop after this many dispatches
    #[arg(long = "max-pings", value_name = "N")]
    max_pings: Option<usize>,

    /// Honour recorded gaps between requests; "false" switches to a fixed rate
    #[arg(long = "use-tx-time",
        value_name = "BOOL",
        default_value = "true",
        action = ArgAction::Set,
        value_parser = parse_use_tx_time,
    )]
    use_tx_time: bool,

    /// Directory holding the access-log files
    #[arg(long = "data-dir", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Interval between dispatches when not using recorded timing
    #[arg(long = "fixed-interval-ms", default_value_t = DEFAULT_FIXED_INTERVAL_MS)]
    fixed_interval_ms: u64,

    /// Print the timeline as JSON lines instead of sending requests
    #[arg(long = "dry-run")]
    dry_run: bool,
}

impl Cli {
    fn record_filter(&self) -> RecordFilter {
        RecordFilter::new(self.protocol, self.prefix.clone(), self.http_method.clone())
    }

    /// Fails when `--url-host` is not an absolute http(s) URL
    fn replay_config(&self) -> Result<ReplayConfig, TransportError> {
        parse_url_host(&self.url_host)?;
        Ok(ReplayConfig {
            url_host: self.url_host.clone(),
            pacing: PacingMode::from_flag(
                self.use_tx_time,
                Duration::from_millis(self.fixed_interval_ms),
            ),
            max_dispatches: self.max_pings,
        })
    }
}

/// One JSON object per record, one record per line
fn write_timeline<W: Write>(out: &mut W, timeline: &Timeline) -> io::Result<()> {
    for record in timeline.records() {
        serde_json::to_writer(&mut *out, record).map_err(io::Error::from)?;
        writeln!(out)?;
    }
    out.flush()
}

/// Main CLI function
#[tokio::main]
async fn main() -> Result<()> {
    // Loads any variables from .env file that are not already set
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    // Bridge any `log` records from dependencies into tracing
    tracing_log::LogTracer::init().ok();

    let config = match cli.replay_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return Err(anyhow!(e));
        }
    };

    let record_filter = cli.record_filter();
    if record_filter.is_active() {
        info!("Record filter: {:?}", record_filter);
    }

    let timeline = match load_directory(&cli.data_dir, &record_filter) {
        Ok(timeline) => timeline,
        Err(e) => {
            error!("{}", e);
            return Err(anyhow!(e));
        }
    };

    if timeline.is_empty() {
        report::no_data();
        return Ok(());
    }

    if cli.dry_run {
        let timeline = timeline.limit(cli.max_pings);
        return match write_timeline(&mut io::stdout().lock(), &timeline) {
            // piped into head/tail
            Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
            other => other.map_err(Into::into),
        };
    }

    let transport = Arc::new(HttpTransport::new(HttpClientConfig::from_env())?);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping dispatch");
            ctrl_c.cancel();
        }
    });

    let summary = replay_timeline(timeline, &config, transport, cancel).await;
    info!(
        "Run finished: {} dispatched, {} responses, {} transport errors",
        summary.dispatched, summary.stats.response_count, summary.stats.transport_errors
    );

    Ok(())
}
