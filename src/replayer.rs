// SPDX-License-Identifier: Apache-2.0 OR MIT
// SPDX-FileCopyrightText: 2025 alb-replay contributors

//! Paced replay of a timeline against a target host
//!
//! One driver walks the timeline in order and hands each record to the
//! [`Transport`] on its own task without waiting for the response. Pacing
//! follows either the recorded gaps between timestamps or a fixed interval.
//! Deadlines are absolute, so time spent dispatching does not add up as
//! drift.

use async_trait::async_trait;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::reader::Timeline;
use crate::report;
use crate::stats::{rate_per_sec, RunStats, StatsSnapshot};
use crate::types::LogRecord;
use crate::uri::join_target;

/// How the gap between two dispatches is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingMode {
    /// Wait as long as the recorded gap between consecutive timestamps
    TimingFaithful,
    /// Wait a constant interval regardless of the recorded timing
    FixedRate(Duration),
}

impl PacingMode {
    /// `use_tx_time` true selects the recorded timing
    pub fn from_flag(use_tx_time: bool, fixed_interval: Duration) -> Self {
        if use_tx_time {
            PacingMode::TimingFaithful
        } else {
            PacingMode::FixedRate(fixed_interval)
        }
    }
}

/// Replay configuration
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Base URL every path prefix is appended to
    pub url_host: String,

    /// Pacing, fixed for the whole run
    pub pacing: PacingMode,

    /// Replay at most this many records from the start of the timeline
    pub max_dispatches: Option<usize>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            url_host: "http://localhost".to_string(),
            pacing: PacingMode::TimingFaithful,
            max_dispatches: None,
        }
    }
}

/// A completed HTTP exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub elapsed: Duration,
}

/// Transport trait for pluggable request execution
///
/// Any status code, 5xx included, is a successful completion. Errors are
/// for exchanges that never produced a status.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a GET for `url`
    async fn get(&self, url: &str) -> Result<TransportResponse, TransportError>;
}

/// Position of the driver in the timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Dispatching(usize),
    Complete,
}

impl SchedulerState {
    /// State after the current step of a timeline of `len` records
    pub fn advance(self, len: usize) -> SchedulerState {
        match self {
            SchedulerState::Idle if len == 0 => SchedulerState::Complete,
            SchedulerState::Idle => SchedulerState::Dispatching(0),
            SchedulerState::Dispatching(i) if i + 1 < len => SchedulerState::Dispatching(i + 1),
            SchedulerState::Dispatching(_) | SchedulerState::Complete => SchedulerState::Complete,
        }
    }
}

/// Result of a replay run
#[derive(Debug, Clone)]
pub struct ReplaySummary {
    pub dispatched: usize,
    /// Time from the first dispatch until the driver reached `Complete`
    pub dispatch_elapsed: Duration,
    /// Dispatches per second, two decimals
    pub dispatch_rate: f64,
    pub cancelled: bool,
    /// Counters after every in-flight response drained
    pub stats: StatsSnapshot,
}

/// Signed milliseconds from `current` to `next`.
///
/// `None` when either timestamp is missing or is not RFC 3339.
pub fn timestamp_delta_ms(current: &LogRecord, next: &LogRecord) -> Option<i64> {
    let from = current.timestamp_utc()?;
    let to = next.timestamp_utc()?;
    Some(to.signed_duration_since(from).num_milliseconds())
}

/// Wait between dispatching `current` and dispatching `next`.
///
/// A zero or negative recorded gap means no wait at all.
pub fn pacing_delay(mode: PacingMode, current: &LogRecord, next: &LogRecord) -> Duration {
    match mode {
        PacingMode::FixedRate(interval) => interval,
        PacingMode::TimingFaithful => match timestamp_delta_ms(current, next) {
            Some(ms) if ms > 0 => Duration::from_millis(ms as u64),
            Some(_) => Duration::ZERO,
            None => {
                debug!(
                    "Unparseable timestamp pair {:?} -> {:?}; not waiting",
                    current.timestamp, next.timestamp
                );
                Duration::ZERO
            }
        },
    }
}

/// Spawn the request for one record and return without waiting on it
fn dispatch<T: Transport + 'static>(
    record: &LogRecord,
    url_host: &str,
    transport: Arc<T>,
    stats: Arc<RunStats>,
) -> JoinHandle<()> {
    let url = join_target(url_host, record.path_prefix());
    let timestamp = record.timestamp.clone().unwrap_or_default();
    debug!("Dispatching GET {}", url);

    tokio::spawn(async move {
        match transport.get(&url).await {
            Ok(response) => {
                let tally = stats.record_response(response.status);
                report::response_line(&timestamp, response.elapsed, &url, response.status, tally.count);
                if tally.periodic_due {
                    report::periodic(tally.count, stats.elapsed());
                }
            }
            Err(e) => {
                stats.record_transport_error();
                warn!("{}: {:#}", timestamp, anyhow::Error::from(e));
            }
        }
    })
}

/// A pause the scheduler takes before its next dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wait {
    pub delay: Duration,
    /// Print the pacing progress line before sleeping
    pub announce: bool,
}

/// Decide whether to pause after dispatching `current`.
///
/// `None` after the final record and whenever the delay is zero. Only
/// timing-faithful waits are announced.
pub fn next_wait(mode: PacingMode, current: &LogRecord, next: Option<&LogRecord>) -> Option<Wait> {
    let delay = pacing_delay(mode, current, next?);
    if delay.is_zero() {
        return None;
    }
    Some(Wait {
        delay,
        announce: mode == PacingMode::TimingFaithful,
    })
}

/// Collect finished dispatch tasks without blocking
fn reap_finished(in_flight: &mut FuturesUnordered<JoinHandle<()>>) {
    while let Some(Some(result)) = in_flight.next().now_or_never() {
        if let Err(e) = result {
            warn!("Dispatch task failed: {}", e);
        }
    }
}

/// Replay `timeline` against `config.url_host`.
///
/// Records are dispatched strictly in timeline order. Responses are counted
/// as they arrive, in whatever order that is. The driver stops early only when
/// `cancel` fires; either way every in-flight request is awaited before
/// the summary is returned.
///
/// # Examples
/// ```no_run
/// use alb_replay::{load_directory, replay_timeline, HttpClientConfig, HttpTransport, RecordFilter, ReplayConfig};
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let timeline = load_directory("./data", &RecordFilter::default())?;
///     let transport = Arc::new(HttpTransport::new(HttpClientConfig::default())?);
///     let config = ReplayConfig {
///         url_host: "http://staging.internal:8080".to_string(),
///         ..Default::default()
///     };
///
///     let summary = replay_timeline(timeline, &config, transport, CancellationToken::new()).await;
///     println!("{} responses", summary.stats.response_count);
///     Ok(())
/// }
/// ```
pub async fn replay_timeline<T: Transport + 'static>(
    timeline: Timeline,
    config: &ReplayConfig,
    transport: Arc<T>,
    cancel: CancellationToken,
) -> ReplaySummary {
    let records = timeline.limit(config.max_dispatches).into_records();
    let len = records.len();
    info!("Replaying {} records against {} ({:?})", len, config.url_host, config.pacing);

    let started = Instant::now();
    let stats = Arc::new(RunStats::with_start(len as u64, started));
    let mut in_flight = FuturesUnordered::new();
    let mut deadline = started;
    let mut dispatched = 0usize;
    let mut cancelled = false;
    let mut state = SchedulerState::Idle.advance(len);

    while let SchedulerState::Dispatching(i) = state {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }

        let record = &records[i];
        in_flight.push(dispatch(record, &config.url_host, transport.clone(), stats.clone()));
        dispatched += 1;
        reap_finished(&mut in_flight);

        state = state.advance(len);
        let next = match state {
            SchedulerState::Dispatching(n) => records.get(n),
            _ => None,
        };
        let Some(wait) = next_wait(config.pacing, record, next) else {
            continue;
        };
        if wait.announce {
            report::pacing(wait.delay, dispatched, started.elapsed());
        }

        deadline += wait.delay;
        tokio::select! {
            _ = sleep_until(deadline) => {}
            _ = cancel.cancelled() => {
                cancelled = true;
                break;
            }
        }
    }

    if cancelled {
        info!("Replay cancelled after {} of {} dispatches", dispatched, len);
    }

    let dispatch_elapsed = started.elapsed();
    let dispatch_rate = rate_per_sec(dispatched as u64, dispatch_elapsed);
    report::dispatch_complete(dispatched, dispatch_elapsed, dispatch_rate, cancelled);

    while let Some(result) = in_flight.next().await {
        if let Err(e) = result {
            warn!("Dispatch task failed: {}", e);
        }
    }

    let summary = ReplaySummary {
        dispatched,
        dispatch_elapsed,
        dispatch_rate,
        cancelled,
        stats: stats.snapshot(),
    };
    report::final_summary(&summary);
    summary
}
