// SPDX-License-Identifier: Apache-2.0 OR MIT
// SPDX-FileCopyrightText: 2025 alb-replay contributors

//! Response statistics shared by every in-flight dispatch

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Outcome of recording one response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseTally {
    /// Response count including this one
    pub count: u64,
    /// This response lands on a reporting boundary
    pub periodic_due: bool,
}

/// Read-only view of the counters at one moment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsSnapshot {
    pub response_count: u64,
    pub status_counts: BTreeMap<u16, u64>,
    pub transport_errors: u64,
    pub elapsed: Duration,
}

impl StatsSnapshot {
    /// Responses per second over `elapsed`
    pub fn response_rate(&self) -> f64 {
        rate_per_sec(self.response_count, self.elapsed)
    }
}

#[derive(Debug, Default)]
struct Counters {
    responses: u64,
    status_counts: BTreeMap<u16, u64>,
    transport_errors: u64,
}

/// Run-wide response counters.
///
/// Completions arrive in any order and from any worker thread; each update
/// happens under one lock. Transport errors are tallied separately and never
/// count as responses.
#[derive(Debug)]
pub struct RunStats {
    started: Instant,
    reporting_interval: Option<u64>,
    counters: Mutex<Counters>,
}

impl RunStats {
    /// Counters for a run of `planned` dispatches whose clock began at `started`
    pub fn with_start(planned: u64, started: Instant) -> Self {
        Self {
            started,
            reporting_interval: reporting_interval(planned),
            counters: Mutex::new(Counters::default()),
        }
    }

    fn counters(&self) -> MutexGuard<'_, Counters> {
        // A panicking reporter must not take the counters down with it.
        self.counters.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Count a completed response carrying `status`
    pub fn record_response(&self, status: u16) -> ResponseTally {
        let mut counters = self.counters();
        counters.responses += 1;
        *counters.status_counts.entry(status).or_insert(0) += 1;

        let count = counters.responses;
        let periodic_due = self
            .reporting_interval
            .is_some_and(|interval| count % interval == 0);
        ResponseTally { count, periodic_due }
    }

    /// Note a dispatch that produced no status code; returns the error tally
    pub fn record_transport_error(&self) -> u64 {
        let mut counters = self.counters();
        counters.transport_errors += 1;
        counters.transport_errors
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let counters = self.counters();
        StatsSnapshot {
            response_count: counters.responses,
            status_counts: counters.status_counts.clone(),
            transport_errors: counters.transport_errors,
            elapsed: self.started.elapsed(),
        }
    }
}

/// Responses between periodic summaries: about 1% of `planned`.
///
/// `None` when `planned` is too small for the interval to reach one.
pub fn reporting_interval(planned: u64) -> Option<u64> {
    let interval = (planned as f64 / 100.0).round() as u64;
    (interval > 0).then_some(interval)
}

/// `count / elapsed` per second, rounded to two decimals
pub fn rate_per_sec(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    ((count as f64 / secs) * 100.0).round() / 100.0
}
