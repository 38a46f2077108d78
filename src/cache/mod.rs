//! Cache storage: where transfers persist their bytes.
//!
//! A [`CacheStorage`] hands out one [`CacheSink`] per URL. The sink is an
//! append-only destination that remembers how many bytes are already
//! persisted, so a later transfer can resume from exactly that offset, and
//! that can either be committed as the cached artifact or rolled back.
//!
//! [`FileCacheStorage`] is the filesystem implementation; the URL to path
//! mapping it uses lives in [`path`].

use std::path::Path;

use async_trait::async_trait;

mod error;
mod file;
pub mod path;

pub use error::StorageError;
pub use file::{FileCacheStorage, FileSink};
pub use path::{cache_path, extension};

/// Per-URL append-only byte sink.
#[async_trait]
pub trait CacheSink: Send {
    /// Bytes persisted for this URL so far.
    fn current_length(&self) -> u64;

    /// Appends `bytes`.
    async fn write(&mut self, bytes: &[u8]) -> std::io::Result<()>;

    /// Pushes buffered bytes to the backing store.
    async fn flush(&mut self) -> std::io::Result<()>;

    /// Releases the handle. Safe to call more than once.
    async fn close(&mut self) -> std::io::Result<()>;

    /// Promotes everything written so far to the durable cached artifact.
    async fn commit(&mut self) -> std::io::Result<()>;

    /// Discards the partial artifact so the next attempt starts at offset 0.
    async fn rollback(&mut self) -> std::io::Result<()>;
}

/// Source of sinks, keyed by URL.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Opens (or creates) the sink for `url`.
    async fn open(&self, url: &str) -> std::io::Result<Box<dyn CacheSink>>;

    /// A path on the volume holding this storage, for free-space checks.
    fn volume_path(&self) -> &Path;
}
