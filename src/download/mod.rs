//! Resumable HTTP transfers into the cache.
//!
//! This module resumes interrupted downloads from the bytes a cache sink
//! already holds, using open-ended `Range` requests.
//!
//! # Features
//!
//! - Resume offset taken from the sink's persisted length
//! - Streaming copy in fixed-size chunks with throttled progress
//! - Cooperative pause, checked after headers and after every chunk
//! - Free-space gate on the cache volume before the first write
//! - Length verification against `Content-Range`, then commit or rollback
//! - Size probe that learns a resource's length from six bytes
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use resource_downloader::download::{ChannelObserver, HttpClient, ResumableDownloader};
//! use resource_downloader::cache::FileCacheStorage;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (observer, mut events) = ChannelObserver::channel();
//! let downloader = ResumableDownloader::new(
//!     HttpClient::new(),
//!     Arc::new(FileCacheStorage::new("./cache")),
//! )
//! .with_observer(Arc::new(observer));
//!
//! let total = downloader.download("https://cdn.example.com/video.mp4").await?;
//! while let Ok(event) = events.try_recv() {
//!     println!("{event:?}");
//! }
//! println!("cached {total} bytes");
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
pub mod content_range;
mod downloader;
mod error;
mod probe;
mod progress;
mod space;
mod state;

pub use client::{HttpClient, range_from};
pub use downloader::{DownloadOptions, PauseHandle, ResumableDownloader};
pub use error::{DownloadError, ErrorKind};
pub use progress::{ChannelObserver, DownloadEvent, DownloadObserver, NoopObserver, ProgressEvent};
pub use space::{FixedSpace, SpaceCheck, SpaceProbe, VolumeSpace, check_space, meets_floor};
pub use state::TransferState;

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
