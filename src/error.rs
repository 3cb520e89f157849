// SPDX-License-Identifier: Apache-2.0 OR MIT
// SPDX-FileCopyrightText: 2025 alb-replay contributors

//! Error taxonomy for parsing, loading and dispatching.
//!
//! Only [`ReplayError::Directory`] and an invalid target host end a run.
//! Everything else is logged where it happens and the run carries on.

use std::path::PathBuf;
use thiserror::Error;

/// A single log line could not be turned into a record.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("no tokens matched in line of {len} bytes")]
    NoTokens { len: usize },
}

/// A dispatch failed before the target produced a status code.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("not a usable http(s) URL: {url}")]
    InvalidUrl { url: String },
}

/// Input-side failures while building the timeline.
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("could not list log directory {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not read log file {}: {source}", path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
