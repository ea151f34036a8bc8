// xats-net/src/http.rs
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, StatusCode};
use tracing::{debug, error};
use xats_common::error::{Result, XatsError};

use crate::validation::validate_url;

const FETCH_TIMEOUT_SECS: u64 = 120;
const CONNECT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT_STRING: &str = "xats resolver (Rust)";

/// Pluggable transport. The resolver decides what to fetch; this fetches it.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// [`Fetcher`] over reqwest, restricted to https.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: build_http_client(None)?,
        })
    }

    /// Sends `Authorization: Bearer <token>` with every request.
    pub fn with_token(token: &str) -> Result<Self> {
        Ok(Self {
            client: build_http_client(Some(token))?,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        validate_url(url)?;
        debug!("Fetching {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(url, &e))?;
        let status = response.status();
        debug!("Received HTTP status: {} for {}", status, url);
        if !status.is_success() {
            error!("HTTP error {} for URL {}", status, url);
            return Err(classify_status(url, status));
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(url, &e))?;
        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body.to_vec())
    }
}

fn build_http_client(token: Option<&str>) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STRING));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    if let Some(token) = token {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| XatsError::Config(format!("Invalid registry token: {e}")))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }
    Client::builder()
        .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| XatsError::Network(String::new(), format!("Failed to build HTTP client: {e}")))
}

fn transport_error(url: &str, e: &reqwest::Error) -> XatsError {
    if e.is_timeout() {
        XatsError::Timeout(url.to_string())
    } else {
        XatsError::Network(url.to_string(), e.to_string())
    }
}

/// Maps a non-success status to the error taxonomy.
pub(crate) fn classify_status(url: &str, status: StatusCode) -> XatsError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            XatsError::AuthenticationFailed(url.to_string())
        }
        StatusCode::TOO_MANY_REQUESTS => XatsError::RateLimited(url.to_string()),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            XatsError::Timeout(url.to_string())
        }
        _ => XatsError::Network(url.to_string(), format!("HTTP {status}")),
    }
}

#[cfg(test)]
mod tests {
    use xats_common::error::ErrorCode;

    use super::*;

    #[test]
    fn statuses_map_to_codes() {
        let url = "https://registry.example.org/pkg";
        assert_eq!(
            classify_status(url, StatusCode::FORBIDDEN).code(),
            ErrorCode::AuthenticationFailed
        );
        assert_eq!(
            classify_status(url, StatusCode::TOO_MANY_REQUESTS).code(),
            ErrorCode::RateLimited
        );
        assert_eq!(
            classify_status(url, StatusCode::GATEWAY_TIMEOUT).code(),
            ErrorCode::Timeout
        );
        assert_eq!(
            classify_status(url, StatusCode::INTERNAL_SERVER_ERROR).code(),
            ErrorCode::NetworkError
        );
    }

    #[tokio::test]
    async fn refuses_plain_http() {
        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher.fetch("http://registry.example.org/pkg").await.unwrap_err();
        assert!(err.to_string().contains("Must be https"));
    }
}
