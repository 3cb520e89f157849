// SPDX-License-Identifier: Apache-2.0 OR MIT
// SPDX-FileCopyrightText: 2025 alb-replay contributors

//! Access-log reader and timeline construction
//!
//! Reads every file of a log directory (plain text or `.zst`), parses and
//! filters each file's lines, then merges everything into one timeline
//! ordered by timestamp.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::ReplayError;
use crate::parser::{parse_line, RecordFilter};
use crate::types::LogRecord;

/// Records ordered by timestamp, ready to be replayed.
///
/// Every record in a timeline has a timestamp. The order never changes once
/// the timeline is built.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    records: Vec<LogRecord>,
}

impl Timeline {
    /// Drop records without a timestamp and sort the rest.
    ///
    /// The sort is stable and lexical on the raw timestamp text, which
    /// orders ISO-8601 UTC timestamps chronologically.
    pub fn from_records(mut records: Vec<LogRecord>) -> Self {
        records.retain(|record| record.timestamp.is_some());
        info!("Sorting {} rows by timestamp", records.len());
        records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Timeline { records }
    }

    /// Keep only the first `max` records, if a cap is given
    pub fn limit(mut self, max: Option<usize>) -> Self {
        if let Some(max) = max {
            self.records.truncate(max);
        }
        self
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<LogRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Open a log file, decompressing `.zst` files on the fly
pub fn open_source<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let is_compressed = path.extension().is_some_and(|ext| ext == "zst");

    if is_compressed {
        let decoder = zstd::stream::read::Decoder::new(file)?;
        Ok(Box::new(BufReader::new(decoder)))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Parse and filter every line from `reader`.
///
/// `name` only labels log messages. Unparseable lines are logged and
/// skipped; only I/O failures are returned.
pub fn parse_lines<R: BufRead>(reader: R, name: &str, filter: &RecordFilter) -> io::Result<Vec<LogRecord>> {
    let mut records = Vec::new();
    let mut rows = 0usize;
    let mut skipped = 0usize;

    for (line_num, raw) in reader.split(b'\n').enumerate() {
        let raw = raw?;
        rows += 1;

        let line = String::from_utf8_lossy(&raw);
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        match parse_line(line, filter.protocol) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) => {
                warn!("Failed to parse {} line {}: {} ({:?})", name, line_num + 1, e, line);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        info!("Skipped {} unparseable lines in {}", skipped, name);
    }

    info!("filtering {} rows", records.len());
    filter.apply(&mut records);
    info!("filtered to {} rows", records.len());
    debug!("{}: {} raw rows, {} kept", name, rows, records.len());

    Ok(records)
}

/// Read one log file from disk
pub fn read_source<P: AsRef<Path>>(path: P, filter: &RecordFilter) -> Result<Vec<LogRecord>, ReplayError> {
    let path = path.as_ref();
    info!("Reading {}", path.display());

    let source_err = |source| ReplayError::Source {
        path: path.to_path_buf(),
        source,
    };
    let reader = open_source(path).map_err(source_err)?;
    parse_lines(reader, &path.display().to_string(), filter).map_err(source_err)
}

/// Files directly inside `dir`, in file-name order
fn list_sources(dir: &Path) -> Result<Vec<PathBuf>, ReplayError> {
    let dir_err = |source| ReplayError::Directory {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(dir_err)? {
        let entry = entry.map_err(dir_err)?;
        match entry.file_type() {
            Ok(kind) if kind.is_file() => paths.push(entry.path()),
            Ok(_) => debug!("Ignoring non-file entry {}", entry.path().display()),
            Err(e) => warn!("Could not stat {}: {}", entry.path().display(), e),
        }
    }
    paths.sort();
    Ok(paths)
}

/// Build the timeline from every log file in `dir`.
///
/// A directory that cannot be listed is an error. Any single file that cannot
/// be read is logged and left out.
pub fn load_directory<P: AsRef<Path>>(dir: P, filter: &RecordFilter) -> Result<Timeline, ReplayError> {
    let dir = dir.as_ref();
    let mut all_records = Vec::new();

    for path in list_sources(dir)? {
        match read_source(&path, filter) {
            Ok(records) => all_records.extend(records),
            Err(e) => warn!("{}", e),
        }
    }

    Ok(Timeline::from_records(all_records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Field, Protocol};
    use std::io::Cursor;

    fn record_at(ts: Option<&str>, tag: &str) -> LogRecord {
        let mut record = LogRecord::default();
        record.assign(Field::Type, tag);
        if let Some(ts) = ts {
            record.assign(Field::Timestamp, ts);
        }
        record
    }

    #[test]
    fn test_timeline_sorts_and_drops_missing_timestamps() {
        let timeline = Timeline::from_records(vec![
            record_at(Some("2024-01-01T10:00:02Z"), "c"),
            record_at(None, "x"),
            record_at(Some("2024-01-01T10:00:00Z"), "a"),
            record_at(Some("2024-01-01T10:00:01Z"), "b"),
        ]);

        let tags: Vec<_> = timeline.records().iter().map(|r| r.record_type.as_deref().unwrap()).collect();
        assert_eq!(tags, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_timeline_sort_is_stable() {
        let timeline = Timeline::from_records(vec![
            record_at(Some("2024-01-01T10:00:00Z"), "first"),
            record_at(Some("2024-01-01T10:00:00Z"), "second"),
        ]);
        assert_eq!(timeline.records()[0].record_type.as_deref(), Some("first"));
        assert_eq!(timeline.records()[1].record_type.as_deref(), Some("second"));
    }

    #[test]
    fn test_limit() {
        let records = (0..5)
            .map(|i| record_at(Some(&format!("2024-01-01T10:00:0{}Z", i)), "http"))
            .collect();
        let timeline = Timeline::from_records(records);
        assert_eq!(timeline.clone().limit(Some(2)).len(), 2);
        assert_eq!(timeline.clone().limit(Some(10)).len(), 5);
        assert_eq!(timeline.limit(None).len(), 5);
    }

    #[test]
    fn test_parse_lines_skips_blank_and_bad_lines() {
        let input = "http 2024-01-01T10:00:00Z lb\n\n!!!\r\nhttps 2024-01-01T10:00:01Z lb\r\n";
        let records = parse_lines(Cursor::new(input), "mem", &RecordFilter::default()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].elb_identifier.as_deref(), Some("lb"));
    }

    #[test]
    fn test_parse_lines_protocol_filter() {
        let input = "http 2024-01-01T10:00:00Z lb\nwss 2024-01-01T10:00:01Z lb\n";
        let filter = RecordFilter::new(Some(Protocol::Wss), None, None);
        let records = parse_lines(Cursor::new(input), "mem", &filter).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record_type.as_deref(), Some("wss"));
    }

    #[test]
    fn test_parse_lines_tolerates_invalid_utf8() {
        let mut input = b"http 2024-01-01T10:00:00Z lb-\xff\n".to_vec();
        input.extend_from_slice(b"http 2024-01-01T10:00:01Z lb\n");
        let records = parse_lines(Cursor::new(input), "mem", &RecordFilter::default()).unwrap();
        assert_eq!(records.len(), 2);
    }
}
