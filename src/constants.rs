// src/constants.rs
//
// Centralized constants for alb-replay to avoid hardcoded values throughout the codebase

use std::time::Duration;

/// Interval between dispatches in fixed-rate mode (1 second)
pub const DEFAULT_FIXED_INTERVAL_MS: u64 = 1000;

/// Default directory scanned for access-log files
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Default connection pool ceiling per target host
pub const DEFAULT_MAX_CONNECTIONS_PER_HOST: usize = 20;

/// Default TCP connect timeout (seconds)
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default end-to-end request timeout (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Default fixed-rate interval as a `Duration`
pub const DEFAULT_FIXED_INTERVAL: Duration = Duration::from_millis(DEFAULT_FIXED_INTERVAL_MS);

// ============================================================================
// Environment Variable Names
// ============================================================================

/// Environment variable overriding the per-host connection pool size
pub const ENV_MAX_CONNECTIONS: &str = "ALB_REPLAY_MAX_CONNECTIONS";

/// Environment variable overriding the connect timeout (seconds)
pub const ENV_CONNECT_TIMEOUT_SECS: &str = "ALB_REPLAY_CONNECT_TIMEOUT_SECS";

/// Environment variable overriding the request timeout (seconds)
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "ALB_REPLAY_REQUEST_TIMEOUT_SECS";
