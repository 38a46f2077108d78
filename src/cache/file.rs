//! Directory-backed cache storage.
//!
//! Layout under the root:
//! - `<host>/<path>` holds a committed artifact
//! - `<host>/<path>.part` holds bytes of a transfer that has not been committed yet

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};

use super::path::cache_path;
use super::{CacheSink, CacheStorage};

const PARTIAL_SUFFIX: &str = ".part";

/// Cache storage rooted at a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileCacheStorage {
    root: PathBuf,
}

impl FileCacheStorage {
    /// Creates storage rooted at `root`. The directory is created lazily.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Absolute path of the committed artifact for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`super::StorageError`] when the URL cannot be mapped.
    pub fn artifact_path(&self, url: &str) -> Result<PathBuf, super::StorageError> {
        Ok(self.root.join(cache_path(url)?))
    }

    /// Absolute path of the in-progress partial file for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`super::StorageError`] when the URL cannot be mapped.
    pub fn partial_path(&self, url: &str) -> Result<PathBuf, super::StorageError> {
        Ok(partial_path_for(&self.artifact_path(url)?))
    }

    /// Returns the committed artifact path when `url` has been fully cached.
    pub async fn cached_path(&self, url: &str) -> Option<PathBuf> {
        let path = self.artifact_path(url).ok()?;
        tokio::fs::metadata(&path)
            .await
            .ok()
            .filter(std::fs::Metadata::is_file)
            .map(|_| path)
    }
}

fn partial_path_for(artifact: &Path) -> PathBuf {
    let mut name = artifact
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(PARTIAL_SUFFIX);
    artifact.with_file_name(name)
}

#[async_trait]
impl CacheStorage for FileCacheStorage {
    #[instrument(level = "debug", skip(self), fields(root = %self.root.display()))]
    async fn open(&self, url: &str) -> std::io::Result<Box<dyn CacheSink>> {
        let artifact_path = self.artifact_path(url)?;
        let partial_path = partial_path_for(&artifact_path);
        if let Some(parent) = partial_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&partial_path)
            .await?;
        let length = file.metadata().await?.len();
        debug!(path = %partial_path.display(), length, "opened cache sink");

        Ok(Box::new(FileSink {
            artifact_path,
            partial_path,
            file: Some(BufWriter::new(file)),
            length,
        }))
    }

    fn volume_path(&self) -> &Path {
        &self.root
    }
}

/// Append-only sink over a `.part` file.
#[derive(Debug)]
pub struct FileSink {
    artifact_path: PathBuf,
    partial_path: PathBuf,
    file: Option<BufWriter<File>>,
    length: u64,
}

impl FileSink {
    fn writer(&mut self) -> std::io::Result<&mut BufWriter<File>> {
        self.file.as_mut().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "cache sink already closed")
        })
    }
}

#[async_trait]
impl CacheSink for FileSink {
    fn current_length(&self) -> u64 {
        self.length
    }

    async fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.writer()?.write_all(bytes).await?;
        self.length += bytes.len() as u64;
        Ok(())
    }

    async fn flush(&mut self) -> std::io::Result<()> {
        self.writer()?.flush().await
    }

    async fn close(&mut self) -> std::io::Result<()> {
        if let Some(mut writer) = self.file.take() {
            writer.flush().await?;
        }
        Ok(())
    }

    async fn commit(&mut self) -> std::io::Result<()> {
        if let Some(mut writer) = self.file.take() {
            writer.flush().await?;
            writer.get_mut().sync_all().await?;
        }
        tokio::fs::rename(&self.partial_path, &self.artifact_path).await?;
        debug!(path = %self.artifact_path.display(), bytes = self.length, "committed cache artifact");
        Ok(())
    }

    async fn rollback(&mut self) -> std::io::Result<()> {
        self.file = None;
        self.length = 0;
        match tokio::fs::remove_file(&self.partial_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        debug!(path = %self.partial_path.display(), "rolled back partial cache file");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    const URL: &str = "https://cdn.example.com/assets/logo.png";

    #[tokio::test]
    async fn test_open_fresh_sink_has_zero_length() {
        let dir = TempDir::new().unwrap();
        let storage = FileCacheStorage::new(dir.path());

        let sink = storage.open(URL).await.unwrap();
        assert_eq!(sink.current_length(), 0);
        assert!(storage.partial_path(URL).unwrap().exists());
    }

    #[tokio::test]
    async fn test_reopen_reports_persisted_length() {
        let dir = TempDir::new().unwrap();
        let storage = FileCacheStorage::new(dir.path());

        let mut sink = storage.open(URL).await.unwrap();
        sink.write(&[7u8; 400]).await.unwrap();
        sink.close().await.unwrap();
        drop(sink);

        let reopened = storage.open(URL).await.unwrap();
        assert_eq!(reopened.current_length(), 400);
    }

    #[tokio::test]
    async fn test_commit_promotes_partial_to_artifact() {
        let dir = TempDir::new().unwrap();
        let storage = FileCacheStorage::new(dir.path());

        let mut sink = storage.open(URL).await.unwrap();
        sink.write(b"hello").await.unwrap();
        sink.commit().await.unwrap();
        sink.close().await.unwrap();

        let cached = storage.cached_path(URL).await.unwrap();
        assert_eq!(std::fs::read(&cached).unwrap(), b"hello");
        assert!(!storage.partial_path(URL).unwrap().exists());
    }

    #[tokio::test]
    async fn test_rollback_discards_partial() {
        let dir = TempDir::new().unwrap();
        let storage = FileCacheStorage::new(dir.path());

        let mut sink = storage.open(URL).await.unwrap();
        sink.write(&[1u8; 64]).await.unwrap();
        sink.rollback().await.unwrap();
        assert_eq!(sink.current_length(), 0);
        sink.close().await.unwrap();

        assert!(!storage.partial_path(URL).unwrap().exists());
        assert!(storage.cached_path(URL).await.is_none());
        let reopened = storage.open(URL).await.unwrap();
        assert_eq!(reopened.current_length(), 0);
    }

    #[tokio::test]
    async fn test_write_after_close_fails() {
        let dir = TempDir::new().unwrap();
        let storage = FileCacheStorage::new(dir.path());

        let mut sink = storage.open(URL).await.unwrap();
        sink.close().await.unwrap();
        sink.close().await.unwrap();
        assert!(sink.write(b"x").await.is_err());
    }

    #[tokio::test]
    async fn test_open_rejects_unmappable_url() {
        let dir = TempDir::new().unwrap();
        let storage = FileCacheStorage::new(dir.path());

        let error = storage.open("https://cdn.example.com/").await.err().unwrap();
        assert_eq!(error.kind(), std::io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_partial_path_appends_suffix() {
        let storage = FileCacheStorage::new("/cache");
        assert_eq!(
            storage.partial_path(URL).unwrap(),
            PathBuf::from("/cache/cdn.example.com/assets/logo.png.part")
        );
    }
}
