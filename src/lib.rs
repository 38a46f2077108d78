//! Resource Downloader Library
//!
//! Resumable byte-range HTTP transfers into a disk-backed resource cache.
//! Interrupted transfers continue from the bytes already persisted instead of
//! starting over, while callers observe progress and may pause at any time.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`download`] - resumable downloader, size probe, progress hooks, space gate
//! - [`cache`] - cache sink/storage contracts and the directory-backed storage
//! - [`config`] - TOML file configuration for the command-line tool

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod config;
pub mod download;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use cache::{CacheSink, CacheStorage, FileCacheStorage, StorageError};
pub use config::{ConfigError, FileConfig};
pub use download::{
    ChannelObserver, DownloadError, DownloadEvent, DownloadObserver, DownloadOptions, ErrorKind,
    HttpClient, PauseHandle, ProgressEvent, ResumableDownloader, TransferState,
};
