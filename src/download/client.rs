//! HTTP client wrapper for ranged requests.
//!
//! This module provides the `HttpClient` struct which issues the open-ended
//! `Range` requests used by transfers and the size probe.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::RANGE;
use tracing::{debug, instrument};

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use crate::user_agent;

/// HTTP client for ranged downloads.
///
/// Create it once and hand clones to every downloader that needs it: clones
/// share one connection pool, and the client is safe to use from many tasks
/// at once.
///
/// # Example
///
/// ```no_run
/// use resource_downloader::HttpClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new();
/// let response = client
///     .get_range("https://cdn.example.com/assets/logo.png", "bytes=0-")
///     .await?;
/// println!("status: {}", response.status());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Read timeout: 5 minutes (for large files)
    /// - Transparent decompression: disabled
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    pub fn new() -> Self {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new_with_timeouts(connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        let client = build_client(connect_timeout_secs, read_timeout_secs)
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    /// Wraps an already configured reqwest client.
    ///
    /// The client must not decompress bodies on the fly, or range offsets will
    /// not line up with the bytes stored in the cache.
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Sends a GET with the given `Range` header value and returns the response
    /// once headers arrive.
    ///
    /// Non-success statuses are returned as responses, not errors: the caller
    /// decides how to classify them.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Network`] when the request fails at the
    /// transport level (DNS, connect, TLS, timeout).
    #[instrument(level = "debug", skip(self), fields(url = %url, range = %range))]
    pub async fn get_range(&self, url: &str, range: &str) -> Result<reqwest::Response, DownloadError> {
        let response = self
            .client
            .get(url)
            .header(RANGE, range)
            .send()
            .await
            .map_err(|e| DownloadError::network(url, e))?;
        debug!(status = response.status().as_u16(), "received response headers");
        Ok(response)
    }

    /// Returns a reference to the underlying reqwest client.
    ///
    /// This can be used for advanced operations not covered by this wrapper.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

fn build_client(connect_timeout_secs: u64, read_timeout_secs: u64) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .timeout(Duration::from_secs(read_timeout_secs))
        // Byte offsets address the stored representation.
        .gzip(false)
        .user_agent(user_agent::default_download_user_agent())
        .build()
}

/// Formats the open-ended range header for a resume offset.
#[must_use]
pub fn range_from(offset: u64) -> String {
    format!("bytes={offset}-")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_range_from_zero_and_offset() {
        assert_eq!(range_from(0), "bytes=0-");
        assert_eq!(range_from(400), "bytes=400-");
    }

    #[test]
    fn test_http_client_default_builds() {
        let client = HttpClient::default();
        drop(client);
    }

    #[test]
    fn test_get_range_invalid_url_is_network_error() {
        let client = HttpClient::new_with_timeouts(1, 1);
        let result = tokio_test::block_on(client.get_range("not a url", "bytes=0-"));
        assert!(matches!(result, Err(DownloadError::Network { .. })));
    }

    #[test]
    fn test_from_client_keeps_supplied_client() {
        let inner = Client::builder().gzip(false).build().unwrap();
        let client = HttpClient::from_client(inner);
        let _ = client.inner();
    }
}
