// SPDX-License-Identifier: Apache-2.0 OR MIT
// SPDX-FileCopyrightText: 2025 alb-replay contributors

//! Access-log line parsing
//!
//! A line is scanned left to right for tokens that are either bare runs of
//! `[A-Za-z0-9_-:./]` or double-quoted runs that may also hold `=` and
//! trailing whitespace. The Nth token fills the Nth [`SCHEMA`] slot.

use once_cell::sync::Lazy;
use regex::{CaptureMatches, Regex};

use crate::error::ParseError;
use crate::types::{Field, LogRecord, Protocol, SCHEMA};

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z0-9_\-:./]+)|"([A-Za-z0-9_\-:./=]+\s*)""#)
        .expect("token pattern is valid")
});

static PORT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r":[0-9]+").expect("port pattern is valid"));

/// Lazy iterator of `(position, token)` pairs over one line.
///
/// Nothing past the last token pulled from the iterator is scanned, which is
/// what lets the protocol filter abandon a line after its first token.
pub struct Tokenizer<'a> {
    matches: CaptureMatches<'static, 'a>,
    index: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(line: &'a str) -> Self {
        Self {
            matches: TOKEN_RE.captures_iter(line),
            index: 0,
        }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = (usize, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        let caps = self.matches.next()?;
        let token = match (caps.get(1), caps.get(2)) {
            (Some(bare), _) => bare.as_str(),
            (None, Some(quoted)) => quoted.as_str().trim_end(),
            (None, None) => return None,
        };
        let index = self.index;
        self.index += 1;
        Some((index, token))
    }
}

/// Path after the first `:<port>` of a request target.
///
/// `http://example.com:80/api/users` gives `/api/users`. Targets without a
/// port segment, or with nothing after it, have no path prefix.
pub fn derive_path_prefix(request_target: &str) -> Option<&str> {
    let port = PORT_RE.find(request_target)?;
    let rest = &request_target[port.end()..];
    (!rest.is_empty()).then_some(rest)
}

/// Parse one line against the positional schema.
///
/// Returns `Ok(None)` when `protocol` is set and the line's `type` differs;
/// the rest of the line is never tokenized in that case. Tokens beyond the
/// end of the schema are ignored, and a short line keeps what it matched.
pub fn parse_line(line: &str, protocol: Option<Protocol>) -> Result<Option<LogRecord>, ParseError> {
    let mut record = LogRecord::default();
    let mut matched = 0usize;

    for (index, token) in Tokenizer::new(line) {
        let Some(&field) = SCHEMA.get(index) else {
            break;
        };

        if field == Field::Type {
            if let Some(wanted) = protocol {
                if token != wanted.as_str() {
                    return Ok(None);
                }
            }
        }

        record.assign(field, token);
        matched += 1;
    }

    if matched == 0 {
        return Err(ParseError::NoTokens { len: line.len() });
    }

    Ok(Some(record))
}

/// Selection criteria applied while reading logs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Applied during parsing; mismatching lines are dropped early
    pub protocol: Option<Protocol>,

    /// Keep records whose path prefix starts with this
    pub path_prefix: Option<String>,

    /// Keep records with this method; stored uppercased
    pub http_method: Option<String>,
}

impl RecordFilter {
    pub fn new(protocol: Option<Protocol>, path_prefix: Option<String>, http_method: Option<String>) -> Self {
        Self {
            protocol,
            path_prefix,
            http_method: http_method.map(|m| m.to_uppercase()),
        }
    }

    /// Whether the post-parse pass has anything to do
    pub fn is_active(&self) -> bool {
        self.path_prefix.is_some() || self.http_method.is_some()
    }

    /// Post-parse predicate on path prefix and method.
    ///
    /// A record with no path prefix never satisfies a prefix requirement.
    pub fn matches(&self, record: &LogRecord) -> bool {
        let prefix_ok = match &self.path_prefix {
            None => true,
            Some(wanted) => record
                .path_prefix()
                .is_some_and(|path| path.starts_with(wanted.as_str())),
        };
        let method_ok = match &self.http_method {
            None => true,
            Some(wanted) => record
                .http_method
                .as_deref()
                .is_some_and(|method| method.eq_ignore_ascii_case(wanted)),
        };
        prefix_ok && method_ok
    }

    /// Drop every record that fails [`RecordFilter::matches`]
    pub fn apply(&self, records: &mut Vec<LogRecord>) {
        if self.is_active() {
            records.retain(|record| self.matches(record));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = r#"https 2018-07-02T22:23:00.186641Z app/my-loadbalancer/50dc6c495c0c9188 192.168.131.39:2817 10.0.0.1:80 0.086 0.048 0.037 200 200 0 57 "GET https://www.example.com:443/api/users HTTP/1.1" "curl/7.46.0" ECDHE-RSA-AES128-GCM-SHA256 TLSv1.2 arn:aws:elasticloadbalancing:us-east-2:123456789012:targetgroup/my-targets/73e2d6bc24d8a067 "Root=1-58337281-1d84f3d73c47ec4e58577259" "www.example.com" "arn:aws:acm:us-east-2:123456789012:certificate/12345678-1234-1234-1234-123456789012" 1 2018-07-02T22:22:48.364000Z "forward" "-" "-" "10.0.0.1:80" "200""#;

    #[test]
    fn test_full_line() {
        let record = parse_line(LINE, None).unwrap().unwrap();

        assert_eq!(record.record_type.as_deref(), Some("https"));
        assert_eq!(record.timestamp.as_deref(), Some("2018-07-02T22:23:00.186641Z"));
        assert_eq!(record.client_addr.as_deref(), Some("192.168.131.39:2817"));
        assert_eq!(record.request_processing_time, Some(0.086));
        assert_eq!(record.elb_status_code, Some(200));
        assert_eq!(record.sent_bytes, Some(57));
        assert_eq!(record.http_method.as_deref(), Some("GET"));
        assert_eq!(record.request_target.as_deref(), Some("https://www.example.com:443/api/users"));
        assert_eq!(record.http_version.as_deref(), Some("HTTP/1.1"));
        assert_eq!(record.user_agent.as_deref(), Some("curl/7.46.0"));
        assert_eq!(record.trace_id.as_deref(), Some("Root=1-58337281-1d84f3d73c47ec4e58577259"));
        assert_eq!(record.matched_rule_priority.as_deref(), Some("1"));
        assert_eq!(record.actions_executed.as_deref(), Some("forward"));
        assert_eq!(record.redirect_url.as_deref(), Some("-"));
        assert_eq!(record.target_port_list.as_deref(), Some("10.0.0.1:80"));
        assert_eq!(record.target_status_code_list.as_deref(), Some("200"));
        assert_eq!(record.path_prefix(), Some("/api/users"));
    }

    #[test]
    fn test_tokenizer_positions() {
        let tokens: Vec<_> = Tokenizer::new(r#"http 2018-01-01T00:00:00Z "a=b " x"#).collect();
        assert_eq!(
            tokens,
            vec![(0, "http"), (1, "2018-01-01T00:00:00Z"), (2, "a=b"), (3, "x")]
        );
    }

    #[test]
    fn test_quoted_dash_is_a_token() {
        let tokens: Vec<_> = Tokenizer::new(r#""-" "-""#).map(|(_, t)| t).collect();
        assert_eq!(tokens, vec!["-", "-"]);
    }

    #[test]
    fn test_path_prefix_derivation() {
        assert_eq!(derive_path_prefix("http://example.com:80/foo"), Some("/foo"));
        assert_eq!(derive_path_prefix("wss://example.com:443/socket/v1"), Some("/socket/v1"));
        assert_eq!(derive_path_prefix("http://example.com:8080/a/b:9/c"), Some("/a/b:9/c"));
        assert_eq!(derive_path_prefix("http://example.com/foo"), None);
        assert_eq!(derive_path_prefix("http://example.com:80"), None);
    }

    #[test]
    fn test_protocol_mismatch_yields_no_record() {
        assert!(parse_line(LINE, Some(Protocol::Http)).unwrap().is_none());
        assert!(parse_line(LINE, Some(Protocol::Https)).unwrap().is_some());
    }

    #[test]
    fn test_short_line_keeps_prefix() {
        let record = parse_line("h2 2018-07-02T22:23:00Z app/lb/1", None).unwrap().unwrap();
        assert_eq!(record.record_type.as_deref(), Some("h2"));
        assert_eq!(record.elb_identifier.as_deref(), Some("app/lb/1"));
        assert!(record.client_addr.is_none());
        assert!(record.path_prefix().is_none());
    }

    #[test]
    fn test_line_without_tokens_is_an_error() {
        assert!(matches!(parse_line("!!! ???", None), Err(ParseError::NoTokens { len: 7 })));
    }

    #[test]
    fn test_filter_prefix_and_method() {
        let get_users = parse_line(LINE, None).unwrap().unwrap();
        let mut post_users = get_users.clone();
        post_users.http_method = Some("POST".to_string());

        let filter = RecordFilter::new(None, Some("/api".to_string()), Some("get".to_string()));
        assert_eq!(filter.http_method.as_deref(), Some("GET"));
        assert!(filter.matches(&get_users));
        assert!(!filter.matches(&post_users));

        let filter = RecordFilter::new(None, Some("/other".to_string()), None);
        assert!(!filter.matches(&get_users));

        let mut no_path = LogRecord::default();
        no_path.timestamp = Some("2018-07-02T22:23:00Z".to_string());
        let filter = RecordFilter::new(None, Some("/".to_string()), None);
        assert!(!filter.matches(&no_path));
    }

    #[test]
    fn test_inactive_filter_keeps_everything() {
        let mut records = vec![LogRecord::default(), LogRecord::default()];
        RecordFilter::default().apply(&mut records);
        assert_eq!(records.len(), 2);
    }
}
