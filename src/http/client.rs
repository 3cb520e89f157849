// src/http/client.rs
//
// Pooled HTTP client that issues the replayed requests

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{ClientBuilder, Url};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::constants::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_MAX_CONNECTIONS_PER_HOST, DEFAULT_REQUEST_TIMEOUT_SECS,
    ENV_CONNECT_TIMEOUT_SECS, ENV_MAX_CONNECTIONS, ENV_REQUEST_TIMEOUT_SECS,
};
use crate::error::TransportError;
use crate::replayer::{Transport, TransportResponse};

/// HTTP client configuration for replay traffic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpClientConfig {
    /// Maximum number of idle connections kept per host
    pub max_connections_per_host: usize,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Request timeout, covering the whole exchange
    pub request_timeout: Duration,
    /// Disable Nagle's algorithm
    pub tcp_nodelay: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            max_connections_per_host: DEFAULT_MAX_CONNECTIONS_PER_HOST,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            tcp_nodelay: true,
        }
    }
}

impl HttpClientConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each
    /// `ALB_REPLAY_*` key. Values that do not parse are ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(n) = lookup(ENV_MAX_CONNECTIONS).and_then(|s| s.parse::<usize>().ok()) {
            config.max_connections_per_host = n;
        }
        if let Some(secs) = lookup(ENV_CONNECT_TIMEOUT_SECS).and_then(|s| s.parse::<u64>().ok()) {
            config.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = lookup(ENV_REQUEST_TIMEOUT_SECS).and_then(|s| s.parse::<u64>().ok()) {
            config.request_timeout = Duration::from_secs(secs);
        }

        config
    }
}

/// Transport backed by a pooled `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: HttpClientConfig,
}

impl HttpTransport {
    /// Create new HTTP transport
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(config.max_connections_per_host)
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .tcp_nodelay(config.tcp_nodelay)
            .use_rustls_tls()
            .build()
            .context("Failed to build HTTP client")?;

        info!(
            "HTTP client ready: {} connections/host, connect timeout {:?}, request timeout {:?}",
            config.max_connections_per_host, config.connect_timeout, config.request_timeout
        );
        Ok(Self { client, config })
    }

    /// Get configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse, TransportError> {
        let target = Url::parse(url).map_err(|_| TransportError::InvalidUrl {
            url: url.to_string(),
        })?;

        let start = Instant::now();
        let response = self
            .client
            .get(target)
            .send()
            .await
            .map_err(|source| TransportError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status().as_u16();
        // Drain the body so the connection goes back to the pool.
        if let Err(e) = response.bytes().await {
            debug!("Discarding unreadable body from {}: {}", url, e);
        }

        Ok(TransportResponse {
            status,
            elapsed: start.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = HttpClientConfig::default();
        assert_eq!(config.max_connections_per_host, 20);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.tcp_nodelay);
    }

    #[test]
    fn test_lookup_overrides() {
        let env = HashMap::from([
            (ENV_MAX_CONNECTIONS, "64"),
            (ENV_REQUEST_TIMEOUT_SECS, "5"),
            (ENV_CONNECT_TIMEOUT_SECS, "soon"),
        ]);
        let config = HttpClientConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.max_connections_per_host, 64);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.connect_timeout, Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS));
    }

    #[tokio::test]
    async fn test_transport_creation() {
        let transport = HttpTransport::new(HttpClientConfig::default()).unwrap();
        assert_eq!(transport.config().max_connections_per_host, 20);
    }

    #[tokio::test]
    async fn test_malformed_url_is_rejected_before_sending() {
        let transport = HttpTransport::new(HttpClientConfig::default()).unwrap();
        let err = transport.get("not a url/api").await.unwrap_err();
        assert!(matches!(err, TransportError::InvalidUrl { ref url } if url == "not a url/api"));
    }
}
