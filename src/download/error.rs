//! Error types for the download module.
//!
//! Every failed transfer is classified into exactly one [`ErrorKind`]. The
//! richer [`DownloadError`] carries the context (url, status, byte counts,
//! underlying source) and is what `download` returns to its caller.

use std::fmt;

use thiserror::Error;

/// Closed classification of a failed transfer, as reported to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Transport failure, non-success status, or I/O failure while streaming.
    NetworkError,
    /// A cooperative pause was observed.
    TaskCancelled,
    /// The cache volume is below the free-space floor.
    FullDiskError,
    /// No sink was available, or the final byte count did not match the declared total.
    FileVerifyError,
}

impl ErrorKind {
    /// Whether partial bytes persisted by this attempt survive for the next one.
    #[must_use]
    pub fn preserves_partial_data(self) -> bool {
        matches!(self, Self::TaskCancelled | Self::FullDiskError)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NetworkError => "network error",
            Self::TaskCancelled => "task cancelled",
            Self::FullDiskError => "disk full",
            Self::FileVerifyError => "file verification failed",
        };
        f.write_str(label)
    }
}

/// Errors that can occur during a resumable transfer.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// Network-level error (DNS, connection refused, TLS, body read failure).
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Writing, flushing or committing the cache sink failed mid-transfer.
    #[error("cache IO error downloading {url}: {source}")]
    Io {
        /// The URL being downloaded.
        url: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The transfer observed a pause request.
    #[error("download of {url} paused with {persisted_bytes} bytes persisted")]
    Cancelled {
        /// The URL being downloaded.
        url: String,
        /// Bytes durably held by the sink for this URL (resume offset of the next attempt).
        persisted_bytes: u64,
    },

    /// Free space on the cache volume is below the configured floor.
    #[error(
        "insufficient disk space for {url}: {available_bytes} bytes free, {required_bytes} required"
    )]
    InsufficientSpace {
        /// The URL being downloaded.
        url: String,
        /// Free bytes reported by the volume (0 when the query failed).
        available_bytes: u64,
        /// The configured floor.
        required_bytes: u64,
    },

    /// The cache storage could not provide a sink for this URL.
    #[error("no cache sink available for {url}")]
    SinkUnavailable {
        /// The URL being downloaded.
        url: String,
    },

    /// The bytes on disk after end of stream disagree with the declared total.
    #[error("length mismatch for {url}: declared {}, saved {saved_bytes}", fmt_declared(.declared_bytes))]
    LengthMismatch {
        /// The URL being downloaded.
        url: String,
        /// Total declared by `Content-Range`, if the header was usable.
        declared_bytes: Option<u64>,
        /// Initial offset plus bytes written this session.
        saved_bytes: u64,
    },
}

fn fmt_declared(declared: &Option<u64>) -> String {
    declared.map_or_else(|| "unknown".to_string(), |total| total.to_string())
}

impl DownloadError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a sink IO error.
    pub fn io(url: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            url: url.into(),
            source,
        }
    }

    /// Creates a cancellation error.
    pub fn cancelled(url: impl Into<String>, persisted_bytes: u64) -> Self {
        Self::Cancelled {
            url: url.into(),
            persisted_bytes,
        }
    }

    /// Creates an insufficient space error.
    pub fn insufficient_space(
        url: impl Into<String>,
        available_bytes: u64,
        required_bytes: u64,
    ) -> Self {
        Self::InsufficientSpace {
            url: url.into(),
            available_bytes,
            required_bytes,
        }
    }

    /// Creates a missing-sink error.
    pub fn sink_unavailable(url: impl Into<String>) -> Self {
        Self::SinkUnavailable { url: url.into() }
    }

    /// Creates a length mismatch error.
    pub fn length_mismatch(
        url: impl Into<String>,
        declared_bytes: Option<u64>,
        saved_bytes: u64,
    ) -> Self {
        Self::LengthMismatch {
            url: url.into(),
            declared_bytes,
            saved_bytes,
        }
    }

    /// Returns the classification reported to observers for this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUrl { .. }
            | Self::Network { .. }
            | Self::HttpStatus { .. }
            | Self::Io { .. } => ErrorKind::NetworkError,
            Self::Cancelled { .. } => ErrorKind::TaskCancelled,
            Self::InsufficientSpace { .. } => ErrorKind::FullDiskError,
            Self::SinkUnavailable { .. } | Self::LengthMismatch { .. } => {
                ErrorKind::FileVerifyError
            }
        }
    }

    /// Returns the URL this error refers to.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::InvalidUrl { url }
            | Self::Network { url, .. }
            | Self::HttpStatus { url, .. }
            | Self::Io { url, .. }
            | Self::Cancelled { url, .. }
            | Self::InsufficientSpace { url, .. }
            | Self::SinkUnavailable { url }
            | Self::LengthMismatch { url, .. } => url,
        }
    }
}

// No `From<reqwest::Error>` / `From<std::io::Error>`: every variant needs the
// url, which the source errors don't carry. Use the constructors above.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_display_and_kind() {
        let error = DownloadError::http_status("https://cdn.example.com/a.png", 503);
        let msg = error.to_string();
        assert!(msg.contains("503"), "Expected '503' in: {msg}");
        assert!(msg.contains("https://cdn.example.com/a.png"));
        assert_eq!(error.kind(), ErrorKind::NetworkError);
    }

    #[test]
    fn test_io_error_maps_to_network_kind() {
        let io_error = std::io::Error::other("disk went away");
        let error = DownloadError::io("https://cdn.example.com/a.png", io_error);
        assert_eq!(error.kind(), ErrorKind::NetworkError);
        assert!(error.to_string().contains("disk went away"));
    }

    #[test]
    fn test_cancelled_reports_persisted_bytes() {
        let error = DownloadError::cancelled("https://cdn.example.com/a.png", 2048);
        assert_eq!(error.kind(), ErrorKind::TaskCancelled);
        assert!(error.to_string().contains("2048"));
    }

    #[test]
    fn test_insufficient_space_kind() {
        let error = DownloadError::insufficient_space("u", 10, 20);
        assert_eq!(error.kind(), ErrorKind::FullDiskError);
    }

    #[test]
    fn test_length_mismatch_unknown_total_display() {
        let error = DownloadError::length_mismatch("https://cdn.example.com/a.png", None, 950);
        let msg = error.to_string();
        assert!(msg.contains("declared unknown"), "got: {msg}");
        assert!(msg.contains("saved 950"), "got: {msg}");
        assert_eq!(error.kind(), ErrorKind::FileVerifyError);
    }

    #[test]
    fn test_sink_unavailable_kind_and_url() {
        let error = DownloadError::sink_unavailable("https://cdn.example.com/a.png");
        assert_eq!(error.kind(), ErrorKind::FileVerifyError);
        assert_eq!(error.url(), "https://cdn.example.com/a.png");
    }

    #[test]
    fn test_preserves_partial_data_asymmetry() {
        assert!(ErrorKind::TaskCancelled.preserves_partial_data());
        assert!(ErrorKind::FullDiskError.preserves_partial_data());
        assert!(!ErrorKind::NetworkError.preserves_partial_data());
        assert!(!ErrorKind::FileVerifyError.preserves_partial_data());
    }
}
