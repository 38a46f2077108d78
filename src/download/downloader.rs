//! Resumable byte-range downloader.
//!
//! One [`ResumableDownloader`] runs one transfer at a time. Each transfer
//! resumes from the bytes its cache sink already holds, asks the server for the
//! rest with an open-ended `Range`, copies the body into the sink chunk by
//! chunk, and finally commits the sink or rolls it back.
//!
//! # Failure policy
//!
//! | kind              | when                                          | partial bytes |
//! |-------------------|-----------------------------------------------|---------------|
//! | `TaskCancelled`   | pause observed before or during the copy      | kept          |
//! | `FullDiskError`   | cache volume below the free-space floor       | kept          |
//! | `NetworkError`    | non-success status, body read or sink failure | rolled back   |
//! | `FileVerifyError` | no sink, or saved length != declared total    | rolled back   |
//!
//! A transport failure before any response (DNS, connect) is returned to the
//! caller without touching the sink or notifying the observer.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use resource_downloader::{FileCacheStorage, HttpClient, ResumableDownloader};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = Arc::new(FileCacheStorage::new("./cache"));
//! let downloader = ResumableDownloader::new(HttpClient::new(), storage);
//! let total = downloader
//!     .download("https://cdn.example.com/assets/logo.png")
//!     .await?;
//! println!("cached {total} bytes");
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::HttpClient;
use super::client::range_from;
use super::constants::{CHUNK_SIZE, MIN_FREE_SPACE_BYTES, PROGRESS_INTERVAL};
use super::content_range::instance_length_from_headers;
use super::error::DownloadError;
use super::probe::{KnownLength, probe_instance_length};
use super::progress::{DownloadObserver, NoopObserver, ProgressEvent, ProgressThrottle};
use super::space::{SpaceCheck, SpaceProbe, VolumeSpace, check_space};
use super::state::{StateCell, TransferState};
use crate::cache::{CacheSink, CacheStorage};

/// Tuning for a downloader's transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Bytes written to the sink per loop iteration (values below 1 are treated as 1).
    pub chunk_size: usize,
    /// Minimum gap between two throttled progress notifications.
    pub progress_interval: Duration,
    /// Free bytes the cache volume must have before a transfer may write.
    pub min_free_space: u64,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            progress_interval: PROGRESS_INTERVAL,
            min_free_space: MIN_FREE_SPACE_BYTES,
        }
    }
}

/// Cloneable handle that requests a cooperative pause from another task or thread.
#[derive(Debug, Clone)]
pub struct PauseHandle {
    flag: Arc<AtomicBool>,
}

impl PauseHandle {
    /// Requests a pause. Takes effect at the next checkpoint of the running transfer.
    pub fn pause(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// True if a pause has been requested and not yet cleared by a new transfer.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// The in-flight operation owned by one `download` call.
struct Transfer {
    url: String,
    initial_offset: u64,
    sink: Option<Box<dyn CacheSink>>,
}

impl Transfer {
    async fn release(&mut self) {
        if let Some(sink) = self.sink.as_mut()
            && let Err(error) = sink.close().await
        {
            warn!(url = %self.url, error = %error, "failed to close cache sink");
        }
    }
}

/// How the body copy loop ended.
enum CopyEnd {
    EndOfStream,
    Paused,
}

/// Resumable downloader for one cache.
///
/// The downloader is `Send + Sync`; share it behind an `Arc` to pause it from
/// another task. Concurrent `download` calls on one instance are serialized.
pub struct ResumableDownloader {
    client: HttpClient,
    storage: Arc<dyn CacheStorage>,
    observer: Arc<dyn DownloadObserver>,
    space: Arc<dyn SpaceProbe>,
    options: DownloadOptions,
    cancelled: Arc<AtomicBool>,
    known_length: Arc<KnownLength>,
    state: StateCell,
    single_flight: Mutex<()>,
}

impl fmt::Debug for ResumableDownloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResumableDownloader")
            .field("options", &self.options)
            .field("state", &self.state.get())
            .field("known_total", &self.known_length.get())
            .field("paused", &self.cancelled.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl ResumableDownloader {
    /// Creates a downloader writing into `storage` through `client`.
    ///
    /// Defaults: no observer, real volume free-space queries, [`DownloadOptions::default`].
    #[must_use]
    pub fn new(client: HttpClient, storage: Arc<dyn CacheStorage>) -> Self {
        Self {
            client,
            storage,
            observer: Arc::new(NoopObserver),
            space: Arc::new(VolumeSpace),
            options: DownloadOptions::default(),
            cancelled: Arc::new(AtomicBool::new(false)),
            known_length: Arc::new(KnownLength::default()),
            state: StateCell::default(),
            single_flight: Mutex::new(()),
        }
    }

    /// Replaces the observer notified by transfers.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn DownloadObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Replaces the free-space source used by the space gate.
    #[must_use]
    pub fn with_space_probe(mut self, space: Arc<dyn SpaceProbe>) -> Self {
        self.space = space;
        self
    }

    /// Replaces the transfer tuning.
    #[must_use]
    pub fn with_options(mut self, options: DownloadOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the transfer tuning in effect.
    #[must_use]
    pub fn options(&self) -> &DownloadOptions {
        &self.options
    }

    /// Returns the state of the current or most recent transfer.
    #[must_use]
    pub fn state(&self) -> TransferState {
        self.state.get()
    }

    /// Requests a cooperative pause of the running transfer.
    ///
    /// The flag is checked once after headers arrive and once after every
    /// chunk; a read already in flight is never interrupted.
    pub fn pause(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns a handle that can pause this downloader from elsewhere.
    #[must_use]
    pub fn pause_handle(&self) -> PauseHandle {
        PauseHandle {
            flag: Arc::clone(&self.cancelled),
        }
    }

    /// Total length learned so far, from a probe or a transfer.
    #[must_use]
    pub fn known_total(&self) -> Option<u64> {
        self.known_length.get()
    }

    /// Runs the free-space gate: true when the cache volume meets the floor.
    #[must_use]
    pub fn check_space(&self) -> bool {
        check_space(
            self.space.as_ref(),
            self.storage.volume_path(),
            self.options.min_free_space,
        ) == SpaceCheck::Sufficient
    }

    /// Learns the total length of `url` without downloading its body.
    ///
    /// When a total is already known it is returned immediately and a probe is
    /// still sent in the background to refresh it. Returns `None` when the
    /// server's answer carries no usable `Content-Range` or the request fails.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn probe_size(&self, url: &str) -> Option<u64> {
        if let Some(total) = self.known_length.get() {
            drop(self.spawn_refresh(url));
            return Some(total);
        }
        let total = probe_instance_length(&self.client, url).await;
        if let Some(total) = total {
            self.known_length.learn(total);
        }
        debug!(total = ?total, "size probe finished");
        total
    }

    /// Callback form of [`probe_size`](Self::probe_size).
    ///
    /// With a known total the callback runs immediately on the calling task;
    /// otherwise it runs on a runtime worker once the probe answers. Must be
    /// called from within a Tokio runtime.
    pub fn spawn_probe_size<F>(&self, url: &str, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(Option<u64>) + Send + 'static,
    {
        if let Some(total) = self.known_length.get() {
            callback(Some(total));
            return self.spawn_refresh(url);
        }
        let client = self.client.clone();
        let known_length = Arc::clone(&self.known_length);
        let url = url.to_string();
        tokio::spawn(async move {
            let total = probe_instance_length(&client, &url).await;
            if let Some(total) = total {
                known_length.learn(total);
            }
            callback(total);
        })
    }

    fn spawn_refresh(&self, url: &str) -> JoinHandle<()> {
        let client = self.client.clone();
        let known_length = Arc::clone(&self.known_length);
        let url = url.to_string();
        tokio::spawn(async move {
            if let Some(total) = probe_instance_length(&client, &url).await {
                known_length.learn(total);
            }
        })
    }

    /// Downloads `url` into the cache, resuming from any persisted partial bytes.
    ///
    /// Runs on the calling task until the transfer ends. Classified failures
    /// are reported to the observer and also returned here; see the module
    /// docs for which failures keep partial bytes.
    ///
    /// # Returns
    ///
    /// The committed total length.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - the URL is invalid or the request fails before any response
    /// - the server answers with a non-success status, or the body read fails
    /// - a pause was observed
    /// - the cache volume is below the free-space floor
    /// - no sink could be opened, or the saved length disagrees with the declared total
    #[instrument(skip(self), fields(url = %url))]
    pub async fn download(&self, url: &str) -> Result<u64, DownloadError> {
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;
        let _single_flight = self.single_flight.lock().await;

        self.cancelled.store(false, Ordering::SeqCst);
        self.state.set(TransferState::Requesting);

        let mut transfer = self.begin_transfer(url).await;
        let outcome = self.run(&mut transfer).await;
        transfer.release().await;

        self.state.set(match &outcome {
            Ok(_) => TransferState::Completed,
            Err(error) => TransferState::from_failure(error.kind()),
        });
        outcome
    }

    async fn begin_transfer(&self, url: &str) -> Transfer {
        let sink = match self.storage.open(url).await {
            Ok(sink) => Some(sink),
            Err(error) => {
                warn!(error = %error, "could not open cache sink");
                None
            }
        };
        let initial_offset = sink.as_ref().map_or(0, |sink| sink.current_length());
        debug!(initial_offset, "resolved resume offset");
        Transfer {
            url: url.to_string(),
            initial_offset,
            sink,
        }
    }

    async fn run(&self, transfer: &mut Transfer) -> Result<u64, DownloadError> {
        let response = self
            .client
            .get_range(&transfer.url, &range_from(transfer.initial_offset))
            .await?;

        if self.cancelled.load(Ordering::SeqCst) {
            return Err(self.fail(DownloadError::cancelled(
                &transfer.url,
                transfer.initial_offset,
            )));
        }

        let url = transfer.url.as_str();
        let Some(sink) = transfer.sink.as_deref_mut() else {
            return Err(self.fail(DownloadError::sink_unavailable(url)));
        };

        let status = response.status();
        if !status.is_success() {
            rollback(sink, url).await;
            return Err(self.fail(DownloadError::http_status(url, status.as_u16())));
        }

        let floor = self.options.min_free_space;
        if let SpaceCheck::Insufficient { available } =
            check_space(self.space.as_ref(), self.storage.volume_path(), floor)
        {
            return Err(self.fail(DownloadError::insufficient_space(url, available, floor)));
        }

        let declared_total = instance_length_from_headers(response.headers());
        if let Some(total) = declared_total {
            self.known_length.learn(total);
        }

        self.state.set(TransferState::Streaming);
        self.stream_body(url, transfer.initial_offset, declared_total, sink, response)
            .await
    }

    async fn stream_body(
        &self,
        url: &str,
        initial_offset: u64,
        declared_total: Option<u64>,
        sink: &mut dyn CacheSink,
        response: reqwest::Response,
    ) -> Result<u64, DownloadError> {
        let mut saved = initial_offset;
        let end = match self
            .copy_body(url, declared_total, sink, response, &mut saved)
            .await
        {
            Ok(end) => end,
            Err(error) => {
                rollback(sink, url).await;
                return Err(self.fail(error));
            }
        };

        match end {
            CopyEnd::Paused => {
                self.emit_progress(saved, declared_total);
                info!(persisted = saved, "download paused");
                Err(self.fail(DownloadError::cancelled(url, saved)))
            }
            CopyEnd::EndOfStream if declared_total != Some(saved) => {
                self.emit_progress(saved, declared_total);
                warn!(declared = ?declared_total, saved, "file size mismatch");
                rollback(sink, url).await;
                Err(self.fail(DownloadError::length_mismatch(url, declared_total, saved)))
            }
            CopyEnd::EndOfStream => {
                let committed = match sink.flush().await {
                    Ok(()) => sink.commit().await,
                    Err(error) => Err(error),
                };
                if let Err(error) = committed {
                    rollback(sink, url).await;
                    return Err(self.fail(DownloadError::io(url, error)));
                }
                self.emit_progress(saved, declared_total);
                info!(
                    bytes = saved,
                    resumed_from = initial_offset,
                    "download complete"
                );
                self.observer.on_success(saved);
                Ok(saved)
            }
        }
    }

    async fn copy_body(
        &self,
        url: &str,
        declared_total: Option<u64>,
        sink: &mut dyn CacheSink,
        response: reqwest::Response,
        saved: &mut u64,
    ) -> Result<CopyEnd, DownloadError> {
        let chunk_size = self.options.chunk_size.max(1);
        let mut throttle =
            ProgressThrottle::starting_at(self.options.progress_interval, Instant::now());
        let mut stream = response.bytes_stream();

        while let Some(next) = stream.next().await {
            let bytes = next.map_err(|e| DownloadError::network(url, e))?;
            for chunk in bytes.chunks(chunk_size) {
                sink.write(chunk)
                    .await
                    .map_err(|e| DownloadError::io(url, e))?;
                let len = chunk.len() as u64;
                self.observer.on_bytes_received(len);
                *saved += len;
                if throttle.ready(Instant::now()) {
                    self.emit_progress(*saved, declared_total);
                }
                if self.cancelled.load(Ordering::SeqCst) {
                    return Ok(CopyEnd::Paused);
                }
            }
        }
        Ok(CopyEnd::EndOfStream)
    }

    fn emit_progress(&self, loaded: u64, total: Option<u64>) {
        self.observer.on_progress(ProgressEvent { loaded, total });
    }

    fn fail(&self, error: DownloadError) -> DownloadError {
        debug!(kind = %error.kind(), error = %error, "transfer failed");
        self.observer.on_failure(error.url(), error.kind());
        error
    }
}

async fn rollback(sink: &mut dyn CacheSink, url: &str) {
    if let Err(error) = sink.rollback().await {
        warn!(url = %url, error = %error, "failed to roll back cache sink");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::{Path, PathBuf};

    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::cache::FileCacheStorage;
    use crate::download::space::FixedSpace;

    struct UnavailableStorage(PathBuf);

    #[async_trait]
    impl CacheStorage for UnavailableStorage {
        async fn open(&self, _url: &str) -> std::io::Result<Box<dyn CacheSink>> {
            Err(std::io::Error::other("storage offline"))
        }

        fn volume_path(&self) -> &Path {
            &self.0
        }
    }

    fn downloader(dir: &TempDir) -> ResumableDownloader {
        ResumableDownloader::new(
            HttpClient::new_with_timeouts(1, 1),
            Arc::new(FileCacheStorage::new(dir.path())),
        )
    }

    #[test]
    fn test_default_options_match_transfer_constants() {
        let options = DownloadOptions::default();
        assert_eq!(options.chunk_size, 4096);
        assert_eq!(options.progress_interval, Duration::from_millis(300));
        assert_eq!(options.min_free_space, 20 * 1024 * 1024);
    }

    #[test]
    fn test_pause_handle_shares_flag() {
        let dir = TempDir::new().unwrap();
        let downloader = downloader(&dir);
        let handle = downloader.pause_handle();
        assert!(!handle.is_paused());

        handle.pause();
        assert!(handle.is_paused());
        downloader.cancelled.store(false, Ordering::SeqCst);
        assert!(!handle.is_paused());

        downloader.pause();
        assert!(handle.is_paused());
    }

    #[test]
    fn test_check_space_uses_floor() {
        let dir = TempDir::new().unwrap();
        let enough = downloader(&dir).with_space_probe(Arc::new(FixedSpace(MIN_FREE_SPACE_BYTES)));
        assert!(enough.check_space());

        let short =
            downloader(&dir).with_space_probe(Arc::new(FixedSpace(MIN_FREE_SPACE_BYTES - 1)));
        assert!(!short.check_space());
    }

    #[test]
    fn test_new_downloader_is_idle() {
        let dir = TempDir::new().unwrap();
        let downloader = downloader(&dir);
        assert_eq!(downloader.state(), TransferState::Idle);
        assert_eq!(downloader.known_total(), None);
    }

    #[tokio::test]
    async fn test_invalid_url_rejected_before_sink_opens() {
        let dir = TempDir::new().unwrap();
        let downloader = downloader(&dir);

        let result = downloader.download("not a url").await;
        assert!(matches!(result, Err(DownloadError::InvalidUrl { .. })));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert_eq!(downloader.state(), TransferState::Idle);
    }

    #[tokio::test]
    async fn test_transport_failure_returns_error_without_touching_sink() {
        let dir = TempDir::new().unwrap();
        let downloader = downloader(&dir);

        // Port 9 (discard) on localhost is expected to refuse the connection.
        let result = downloader.download("http://127.0.0.1:9/asset.bin").await;
        assert!(matches!(result, Err(DownloadError::Network { .. })));
        let partial = dir.path().join("127.0.0.1/asset.bin.part");
        assert_eq!(std::fs::metadata(partial).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_storage_is_not_fatal_before_response() {
        let dir = TempDir::new().unwrap();
        let downloader = ResumableDownloader::new(
            HttpClient::new_with_timeouts(1, 1),
            Arc::new(UnavailableStorage(dir.path().to_path_buf())),
        );
        let transfer = downloader.begin_transfer("https://cdn.example.com/a.bin").await;
        assert!(transfer.sink.is_none());
        assert_eq!(transfer.initial_offset, 0);
    }
}
