// SPDX-License-Identifier: Apache-2.0 OR MIT
// SPDX-FileCopyrightText: 2025 alb-replay contributors

//! alb-replay: replay recorded load-balancer traffic against a target host
//!
//! Reads AWS Application Load Balancer access logs from a directory, merges
//! them into one chronological timeline and fires a GET at the target host
//! for each entry, either honouring the recorded gaps between requests or at
//! a fixed rate.
//!
//! # Features
//!
//! - **Positional parsing**: 29-field ALB record schema, quoted or bare tokens
//! - **Filtering**: by protocol, path prefix and HTTP method
//! - **Auto-compression detection**: transparent zstd decompression for `.zst` files
//! - **Timing-faithful replay**: absolute-deadline scheduling from recorded timestamps
//! - **Pluggable transport**: [`Transport`] trait, with [`HttpTransport`] built on reqwest
//! - **Live reporting**: colour-coded response lines and a final status histogram
//!
//! # Usage
//!
//! ```no_run
//! use alb_replay::{load_directory, Protocol, RecordFilter};
//!
//! let filter = RecordFilter::new(Some(Protocol::Https), Some("/api".to_string()), None);
//! let timeline = load_directory("./data", &filter)?;
//! println!("{} records ready to replay", timeline.len());
//! # Ok::<(), alb_replay::ReplayError>(())
//! ```

pub mod constants;
pub mod error;
pub mod http;
pub mod parser;
pub mod reader;
pub mod replayer;
pub mod report;
pub mod stats;
pub mod types;
pub mod uri;

// Re-export main types
pub use error::{ParseError, ReplayError, TransportError};
pub use http::{HttpClientConfig, HttpTransport};
pub use parser::{derive_path_prefix, parse_line, RecordFilter, Tokenizer};
pub use reader::{load_directory, read_source, Timeline};
pub use replayer::{
    next_wait, pacing_delay, replay_timeline, PacingMode, ReplayConfig, ReplaySummary,
    SchedulerState, Transport, TransportResponse, Wait,
};
pub use stats::{RunStats, StatsSnapshot};
pub use types::{Field, LogRecord, Protocol, SCHEMA};
pub use uri::{join_target, parse_url_host};
