//! Error types for the cache storage module.

use thiserror::Error;

/// Errors produced while mapping a URL into the cache.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The URL did not parse.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The URL has no host to key the cache directory on.
    #[error("URL has no host: {url}")]
    MissingHost {
        /// The offending URL.
        url: String,
    },

    /// The URL path does not name a file.
    #[error("URL path has no file name: {url}")]
    MissingPath {
        /// The offending URL.
        url: String,
    },

    /// A path segment would resolve outside the cache root.
    #[error("unsafe path segment {segment:?} in {url}")]
    UnsafeSegment {
        /// The offending URL.
        url: String,
        /// The rejected segment.
        segment: String,
    },
}

impl StorageError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a missing host error.
    pub fn missing_host(url: impl Into<String>) -> Self {
        Self::MissingHost { url: url.into() }
    }

    /// Creates a missing path error.
    pub fn missing_path(url: impl Into<String>) -> Self {
        Self::MissingPath { url: url.into() }
    }

    /// Creates an unsafe segment error.
    pub fn unsafe_segment(url: impl Into<String>, segment: impl Into<String>) -> Self {
        Self::UnsafeSegment {
            url: url.into(),
            segment: segment.into(),
        }
    }
}

impl From<StorageError> for std::io::Error {
    fn from(error: StorageError) -> Self {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, error)
    }
}
