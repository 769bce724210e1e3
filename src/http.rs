//! HTTP fetching shared by feed reading, discovery and page scraping.
//!
//! One [`reqwest::Client`] is built at startup and handed to every component.
//! Each call gets its own bounded timeout and a body size cap; there is no
//! automatic retry, a failed fetch is reported and the caller moves on.

use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

const MAX_BODY_SIZE: usize = 10 * 1024 * 1024; // 10MB
const MAX_REDIRECTS: usize = 5;

/// Transport-level failures.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded its per-call timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// A response whose body has been read in full.
#[derive(Debug)]
pub struct Fetched {
    pub status: u16,
    /// Lowercased `Content-Type` header, empty when absent
    pub content_type: String,
    pub body: Vec<u8>,
}

impl Fetched {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Builds the shared client.
pub fn build_client(user_agent: &str) -> Result<reqwest::Client, FetchError> {
    let client = reqwest::Client::builder()
        .user_agent(user_agent)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()?;
    Ok(client)
}

/// GETs `url` and reads the body, whatever the status code.
///
/// Callers decide what a non-success status means for them (a feed run
/// aborts, a scraped page is skipped).
pub async fn fetch(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<Fetched, FetchError> {
    tokio::time::timeout(timeout, fetch_inner(client, url))
        .await
        .map_err(|_| FetchError::Timeout(timeout))?
}

/// Like [`fetch`], but a non-2xx status is an error.
pub async fn fetch_success(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<Fetched, FetchError> {
    let fetched = fetch(client, url, timeout).await?;
    if !fetched.is_success() {
        return Err(FetchError::HttpStatus(fetched.status));
    }
    Ok(fetched)
}

async fn fetch_inner(client: &reqwest::Client, url: &str) -> Result<Fetched, FetchError> {
    let response = client.get(url).send().await?;

    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_lowercase();

    tracing::debug!(url = %url, status, content_type = %content_type, "Fetched");

    let body = read_limited_bytes(response, MAX_BODY_SIZE).await?;
    Ok(Fetched {
        status,
        content_type,
        body,
    })
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
