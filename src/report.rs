// SPDX-License-Identifier: Apache-2.0 OR MIT
// SPDX-FileCopyrightText: 2025 alb-replay contributors

//! Console output for a replay run.
//!
//! Everything here goes to stdout. A closed stdout must not stop a load
//! run, so write errors are discarded.

use colored::Colorize;
use std::fmt;
use std::io::{self, Write};
use std::time::Duration;

use crate::replayer::ReplaySummary;
use crate::stats::rate_per_sec;

/// Status-code band used to pick a display color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusBand {
    Success,
    NotFound,
    Other,
}

impl StatusBand {
    pub fn of(status: u16) -> Self {
        match status {
            200..=299 => StatusBand::Success,
            404 => StatusBand::NotFound,
            _ => StatusBand::Other,
        }
    }
}

fn emit(args: fmt::Arguments<'_>) {
    let _ = writeln!(io::stdout().lock(), "{}", args);
}

/// One line per completed response, colored by status band
pub fn response_line(timestamp: &str, latency: Duration, url: &str, status: u16, count: u64) {
    let text = format!(
        "{}: Took {}ms; {} returned {}. Count: {}",
        timestamp,
        latency.as_millis(),
        url,
        status,
        count
    );
    let text = match StatusBand::of(status) {
        StatusBand::Success => text.green(),
        StatusBand::NotFound => text.yellow(),
        StatusBand::Other => text.red(),
    };
    emit(format_args!("{}", text));
}

/// Progress line for a timing-faithful wait of `delay`
pub fn pacing_line(delay: Duration, dispatched: usize, elapsed: Duration) -> String {
    format!(
        "timeout for {}ms after {} requests in {:.3} seconds for {} req/sec",
        delay.as_millis(),
        dispatched,
        elapsed.as_secs_f64(),
        rate_per_sec(dispatched as u64, elapsed)
    )
}

/// Printed before a positive wait in timing-faithful mode
pub fn pacing(delay: Duration, dispatched: usize, elapsed: Duration) {
    emit(format_args!("{}", pacing_line(delay, dispatched, elapsed)));
}

/// Running response throughput, printed about every 1% of the run
pub fn periodic(count: u64, elapsed: Duration) {
    emit(format_args!(
        "ping response status: Count: {} Duration: {:.3} Response Req/sec: {}",
        count,
        elapsed.as_secs_f64(),
        rate_per_sec(count, elapsed)
    ));
}

pub fn no_data() {
    emit(format_args!("No data"));
}

/// Printed as soon as the last dispatch has been sent
pub fn dispatch_complete(dispatched: usize, elapsed: Duration, rate: f64, cancelled: bool) {
    let state = if cancelled { "cancelled" } else { "complete" };
    emit(format_args!(
        "submit {} for {} requests in time {}ms for {} req/sec",
        state,
        dispatched,
        elapsed.as_millis(),
        rate
    ));
}

/// Final report, printed after in-flight responses have drained
pub fn final_summary(summary: &ReplaySummary) {
    let stats = &summary.stats;
    emit(format_args!(
        "responses: {} in {} for {} req/sec ({} transport errors)",
        stats.response_count,
        humantime::format_duration(truncate_to_millis(stats.elapsed)),
        stats.response_rate(),
        stats.transport_errors
    ));
    emit(format_args!("summary stats of request counts by statusCode:"));
    for (status, count) in &stats.status_counts {
        emit(format_args!("  {}: {}", status, count));
    }
}

fn truncate_to_millis(d: Duration) -> Duration {
    Duration::from_millis(d.as_millis() as u64)
}
