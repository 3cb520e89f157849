// SPDX-License-Identifier: Apache-2.0 OR MIT
// SPDX-FileCopyrightText: 2025 alb-replay contributors

use alb_replay::{
    replay_timeline, HttpClientConfig, HttpTransport, LogRecord, PacingMode, ReplayConfig,
    Timeline, Transport, TransportError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport() -> HttpTransport {
    HttpTransport::new(HttpClientConfig {
        connect_timeout: Duration::from_secs(2),
        request_timeout: Duration::from_secs(5),
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_status_codes_are_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let transport = transport();

    let ok = transport.get(&format!("{}/health", server.uri())).await.unwrap();
    assert_eq!(ok.status, 200);

    let missing = transport.get(&format!("{}/gone", server.uri())).await.unwrap();
    assert_eq!(missing.status, 404);
}

#[tokio::test]
async fn test_unreachable_host_is_transport_error() {
    // Bind then drop to get a port with nothing listening
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let err = transport()
        .get(&format!("http://127.0.0.1:{port}/anything"))
        .await
        .unwrap_err();

    match err {
        TransportError::Request { url, .. } => assert!(url.ends_with("/anything")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_replay_against_live_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let records = [
        ("2024-01-01T10:00:00Z", "http://lb:80/api/users"),
        ("2024-01-01T10:00:00Z", "http://lb:80/api/missing"),
        ("2024-01-01T10:00:00Z", "http://lb:80/api/users"),
    ]
    .into_iter()
    .map(|(ts, request)| LogRecord {
        timestamp: Some(ts.to_string()),
        request_target: Some(request.to_string()),
        ..Default::default()
    })
    .collect();

    let config = ReplayConfig {
        url_host: server.uri(),
        pacing: PacingMode::TimingFaithful,
        max_dispatches: None,
    };
    let summary = replay_timeline(
        Timeline::from_records(records),
        &config,
        Arc::new(transport()),
        CancellationToken::new(),
    )
    .await;

    assert_eq!(summary.stats.response_count, 3);
    assert_eq!(summary.stats.status_counts.get(&200), Some(&2));
    assert_eq!(summary.stats.status_counts.get(&404), Some(&1));
    assert_eq!(summary.stats.transport_errors, 0);
}
