// SPDX-License-Identifier: Apache-2.0 OR MIT
// SPDX-FileCopyrightText: 2025 alb-replay contributors

//! Core types for access-log records and their positional schema
//!
//! A log line is a flat sequence of tokens. The Nth token belongs to the
//! Nth entry of [`SCHEMA`]; nothing else decides which field a token fills.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::parser::derive_path_prefix;

/// Protocol tag found in the first field of every access-log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
#[clap(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
    H2,
    Wss,
}

impl Protocol {
    /// The tag exactly as it appears in the log
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
            Protocol::H2 => "h2",
            Protocol::Wss => "wss",
        }
    }
}

impl FromStr for Protocol {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            "h2" => Ok(Protocol::H2),
            "wss" => Ok(Protocol::Wss),
            _ => bail!("Unknown protocol: {} (expected one of wss, h2, http, https)", s),
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named position in the access-log layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Type,
    Timestamp,
    Elb,
    ClientPort,
    TargetPort,
    RequestProcessingTime,
    TargetProcessingTime,
    ResponseProcessingTime,
    ElbStatusCode,
    TargetStatusCode,
    ReceivedBytes,
    SentBytes,
    HttpMethod,
    Request,
    HttpVersion,
    UserAgent,
    SslCipher,
    SslProtocol,
    TargetGroupArn,
    TraceId,
    DomainName,
    ChosenCertArn,
    MatchedRulePriority,
    RequestCreationTime,
    ActionsExecuted,
    RedirectUrl,
    ErrorReason,
    TargetPortList,
    TargetStatusCodeList,
}

/// Ordered field layout of an application load balancer access-log line.
///
/// The quoted request line (`"GET http://host:80/path HTTP/1.1"`) is
/// tokenized on whitespace, so it occupies three positions here:
/// `http_method`, `request` and `http_version`.
pub const SCHEMA: [Field; 29] = [
    Field::Type,
    Field::Timestamp,
    Field::Elb,
    Field::ClientPort,
    Field::TargetPort,
    Field::RequestProcessingTime,
    Field::TargetProcessingTime,
    Field::ResponseProcessingTime,
    Field::ElbStatusCode,
    Field::TargetStatusCode,
    Field::ReceivedBytes,
    Field::SentBytes,
    Field::HttpMethod,
    Field::Request,
    Field::HttpVersion,
    Field::UserAgent,
    Field::SslCipher,
    Field::SslProtocol,
    Field::TargetGroupArn,
    Field::TraceId,
    Field::DomainName,
    Field::ChosenCertArn,
    Field::MatchedRulePriority,
    Field::RequestCreationTime,
    Field::ActionsExecuted,
    Field::RedirectUrl,
    Field::ErrorReason,
    Field::TargetPortList,
    Field::TargetStatusCodeList,
];

impl Field {
    /// Field name as used in the AWS access-log documentation
    pub fn name(&self) -> &'static str {
        match self {
            Field::Type => "type",
            Field::Timestamp => "timestamp",
            Field::Elb => "elb",
            Field::ClientPort => "client:port",
            Field::TargetPort => "target:port",
            Field::RequestProcessingTime => "request_processing_time",
            Field::TargetProcessingTime => "target_processing_time",
            Field::ResponseProcessingTime => "response_processing_time",
            Field::ElbStatusCode => "elb_status_code",
            Field::TargetStatusCode => "target_status_code",
            Field::ReceivedBytes => "received_bytes",
            Field::SentBytes => "sent_bytes",
            Field::HttpMethod => "http_method",
            Field::Request => "request",
            Field::HttpVersion => "http_version",
            Field::UserAgent => "user_agent",
            Field::SslCipher => "ssl_cipher",
            Field::SslProtocol => "ssl_protocol",
            Field::TargetGroupArn => "target_group_arn",
            Field::TraceId => "trace_id",
            Field::DomainName => "domain_name",
            Field::ChosenCertArn => "chosen_cert_arn",
            Field::MatchedRulePriority => "matched_rule_priority",
            Field::RequestCreationTime => "request_creation_time",
            Field::ActionsExecuted => "actions_executed",
            Field::RedirectUrl => "redirect_url",
            Field::ErrorReason => "error_reason",
            Field::TargetPortList => "target:port_list",
            Field::TargetStatusCodeList => "target_status_code_list",
        }
    }
}

/// Single parsed access-log entry
///
/// Every field is optional: a short line keeps whatever prefix of the
/// schema it matched. Only `timestamp` is required before a record may be
/// scheduled, and that check happens when the timeline is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,

    /// Raw ISO-8601 timestamp; compared lexically when sorting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    #[serde(rename = "elb", skip_serializing_if = "Option::is_none")]
    pub elb_identifier: Option<String>,

    #[serde(rename = "client:port", skip_serializing_if = "Option::is_none")]
    pub client_addr: Option<String>,

    #[serde(rename = "target:port", skip_serializing_if = "Option::is_none")]
    pub target_addr: Option<String>,

    /// Seconds; the load balancer writes -1 when the value is unknown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_processing_time: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_processing_time: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_processing_time: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub elb_status_code: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_status_code: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_bytes: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_bytes: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,

    /// Request target including scheme, host and port
    #[serde(rename = "request", skip_serializing_if = "Option::is_none")]
    pub request_target: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_version: Option<String>,

    // Opaque trailing fields, carried so a record survives re-serialization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_cipher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_group_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chosen_cert_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_rule_priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_creation_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions_executed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    #[serde(rename = "target:port_list", skip_serializing_if = "Option::is_none")]
    pub target_port_list: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_status_code_list: Option<String>,
}

impl LogRecord {
    /// Store `token` in the slot for `field`.
    ///
    /// Numeric fields that do not parse (the log uses `-` for "none") are
    /// left empty rather than rejecting the record.
    pub fn assign(&mut self, field: Field, token: &str) {
        let text = || Some(token.to_string());
        match field {
            Field::Type => self.record_type = text(),
            Field::Timestamp => self.timestamp = text(),
            Field::Elb => self.elb_identifier = text(),
            Field::ClientPort => self.client_addr = text(),
            Field::TargetPort => self.target_addr = text(),
            Field::RequestProcessingTime => self.request_processing_time = token.parse().ok(),
            Field::TargetProcessingTime => self.target_processing_time = token.parse().ok(),
            Field::ResponseProcessingTime => self.response_processing_time = token.parse().ok(),
            Field::ElbStatusCode => self.elb_status_code = token.parse().ok(),
            Field::TargetStatusCode => self.target_status_code = token.parse().ok(),
            Field::ReceivedBytes => self.received_bytes = token.parse().ok(),
            Field::SentBytes => self.sent_bytes = token.parse().ok(),
            Field::HttpMethod => self.http_method = text(),
            Field::Request => self.request_target = text(),
            Field::HttpVersion => self.http_version = text(),
            Field::UserAgent => self.user_agent = text(),
            Field::SslCipher => self.ssl_cipher = text(),
            Field::SslProtocol => self.ssl_protocol = text(),
            Field::TargetGroupArn => self.target_group_arn = text(),
            Field::TraceId => self.trace_id = text(),
            Field::DomainName => self.domain_name = text(),
            Field::ChosenCertArn => self.chosen_cert_arn = text(),
            Field::MatchedRulePriority => self.matched_rule_priority = text(),
            Field::RequestCreationTime => self.request_creation_time = text(),
            Field::ActionsExecuted => self.actions_executed = text(),
            Field::RedirectUrl => self.redirect_url = text(),
            Field::ErrorReason => self.error_reason = text(),
            Field::TargetPortList => self.target_port_list = text(),
            Field::TargetStatusCodeList => self.target_status_code_list = text(),
        }
    }

    /// Path portion of the request target, derived on every call
    pub fn path_prefix(&self) -> Option<&str> {
        self.request_target.as_deref().and_then(derive_path_prefix)
    }

    /// Timestamp as a UTC instant, if it is valid RFC 3339
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        self.timestamp
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}
