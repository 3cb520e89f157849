//! Dispatch URL construction
//!
//! Joins the configured target host with a record's path prefix.

use reqwest::Url;

use crate::error::TransportError;

/// Check that `url_host` is an absolute http or https URL with a host.
///
/// ```
/// use alb_replay::uri::parse_url_host;
///
/// assert!(parse_url_host("http://localhost:8080").is_ok());
/// assert!(parse_url_host("localhost:8080").is_err());
/// ```
pub fn parse_url_host(url_host: &str) -> Result<Url, TransportError> {
    let invalid = || TransportError::InvalidUrl {
        url: url_host.to_string(),
    };
    let url = Url::parse(url_host).map_err(|_| invalid())?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(invalid()),
    }
}

/// Build the dispatch URL for one record
///
/// - Host: `http://staging.internal:8080/`
/// - Path prefix: `/api/users`
/// - Result: `http://staging.internal:8080/api/users`
///
/// A record with no path prefix is sent to the host itself.
///
/// # Examples
/// ```
/// use alb_replay::uri::join_target;
///
/// assert_eq!(join_target("http://localhost:3000/", Some("/health")), "http://localhost:3000/health");
/// assert_eq!(join_target("http://localhost:3000", None), "http://localhost:3000");
/// ```
pub fn join_target(url_host: &str, path_prefix: Option<&str>) -> String {
    match path_prefix {
        None => url_host.to_string(),
        Some(path) => {
            let host = url_host.trim_end_matches('/');
            if path.starts_with('/') {
                format!("{}{}", host, path)
            } else {
                format!("{}/{}", host, path)
            }
        }
    }
}
