//! Shared HTTP client and fetch outcome classification.
//!
//! One [`HttpClient`] is built per run and shared by every unit of work. All
//! fetches go through the [`Fetcher`] trait so pipelines can be driven by a
//! scripted fetcher in tests.

mod user_agent;

pub use user_agent::{browser_headers, resolve_user_agent, BROWSER_USER_AGENT};

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

/// Why a single fetch produced no body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchFailure {
    #[error("Timeout")]
    Timeout,
    #[error("Invalid status code: {0}")]
    NonOkStatus(u16),
    #[error("{0}")]
    OtherError(String),
}

impl FetchFailure {
    /// HTTP status carried by the failure, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchFailure::NonOkStatus(code) => Some(*code),
            _ => None,
        }
    }
}

/// A response body, or the reason there isn't one.
pub type FetchResult = Result<String, FetchFailure>;

/// Capability to GET one URL and return its body.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url`. `timeout` overrides the client's default for this request.
    async fn fetch(&self, url: &str, timeout: Option<Duration>) -> FetchResult;
}

/// HTTP client shared read-only across all units of a run.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a client with browser-like headers and a default per-request timeout.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(browser_headers())
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpClient {
    async fn fetch(&self, url: &str, timeout: Option<Duration>) -> FetchResult {
        let mut request = self.client.get(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(classify_error)?;
        let status = response.status();
        if status != StatusCode::OK {
            debug!(url, status = status.as_u16(), "non-OK response");
            return Err(FetchFailure::NonOkStatus(status.as_u16()));
        }

        response.text().await.map_err(classify_error)
    }
}

fn classify_error(err: reqwest::Error) -> FetchFailure {
    if err.is_timeout() {
        FetchFailure::Timeout
    } else {
        FetchFailure::OtherError(err.to_string())
    }
}

/// Turn a bare domain into an absolute URL, defaulting to https.
pub fn normalize_url(domain: &str) -> String {
    let domain = domain.trim();
    if has_web_scheme(domain) {
        domain.to_string()
    } else {
        format!("https://{}", domain)
    }
}

/// Whether `url` starts with `http://` or `https://`, in any case.
fn has_web_scheme(url: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        url.get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_prepends_https() {
        assert_eq!(normalize_url("shop.com"), "https://shop.com");
        assert_eq!(normalize_url("  shop.com "), "https://shop.com");
    }

    #[test]
    fn normalize_keeps_existing_scheme() {
        assert_eq!(normalize_url("http://shop.com"), "http://shop.com");
        assert_eq!(normalize_url("https://shop.com/x"), "https://shop.com/x");
    }

    #[test]
    fn normalize_scheme_is_case_insensitive() {
        assert_eq!(normalize_url("HTTPS://Shop.com"), "HTTPS://Shop.com");
        assert_eq!(normalize_url("Http://shop.com"), "Http://shop.com");
        assert_eq!(normalize_url("httpshop.com"), "https://httpshop.com");
    }

    #[test]
    fn failure_display_matches_results_file() {
        assert_eq!(FetchFailure::Timeout.to_string(), "Timeout");
        assert_eq!(
            FetchFailure::NonOkStatus(503).to_string(),
            "Invalid status code: 503"
        );
        assert_eq!(FetchFailure::OtherError("dns".into()).to_string(), "dns");
    }

    #[test]
    fn failure_status_only_for_non_ok() {
        assert_eq!(FetchFailure::NonOkStatus(404).status(), Some(404));
        assert_eq!(FetchFailure::Timeout.status(), None);
    }
}
