//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod socket_guard;

use std::sync::Arc;

use resource_downloader::download::FixedSpace;
use resource_downloader::{
    ChannelObserver, DownloadEvent, DownloadOptions, FileCacheStorage, HttpClient,
    ResumableDownloader,
};
use tokio::sync::mpsc::UnboundedReceiver;

/// Free space reported to the gate in tests that are not about disk space (1 GiB).
pub const PLENTY_OF_SPACE: u64 = 1024 * 1024 * 1024;

/// Deterministic body of `len` bytes.
#[must_use]
pub fn body(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// `Content-Range` value for the slice `start..total`.
#[must_use]
pub fn content_range(start: usize, total: usize) -> String {
    format!("bytes {start}-{}/{total}", total - 1)
}

/// Builds a downloader over `storage` that records events and never trips the space gate.
pub fn recording_downloader(
    storage: Arc<FileCacheStorage>,
    options: DownloadOptions,
) -> (ResumableDownloader, UnboundedReceiver<DownloadEvent>) {
    let (observer, events) = ChannelObserver::channel();
    let downloader = ResumableDownloader::new(HttpClient::new_with_timeouts(5, 10), storage)
        .with_observer(Arc::new(observer))
        .with_space_probe(Arc::new(FixedSpace(PLENTY_OF_SPACE)))
        .with_options(options);
    (downloader, events)
}

/// Drains every event already emitted.
pub fn drain(events: &mut UnboundedReceiver<DownloadEvent>) -> Vec<DownloadEvent> {
    let mut collected = Vec::new();
    while let Ok(event) = events.try_recv() {
        collected.push(event);
    }
    collected
}

/// Sum of all raw-bytes notifications.
#[must_use]
pub fn bytes_received(events: &[DownloadEvent]) -> u64 {
    events
        .iter()
        .map(|event| match event {
            DownloadEvent::BytesReceived(len) => *len,
            _ => 0,
        })
        .sum()
}

/// Writes `bytes` as the partial data already persisted for `url`.
pub fn seed_partial(storage: &FileCacheStorage, url: &str, bytes: &[u8]) {
    let partial = storage.partial_path(url).expect("map url");
    std::fs::create_dir_all(partial.parent().expect("parent")).expect("create dirs");
    std::fs::write(&partial, bytes).expect("seed partial");
}

/// Length of the partial file for `url`, `None` if it does not exist.
#[must_use]
pub fn partial_len(storage: &FileCacheStorage, url: &str) -> Option<u64> {
    let partial = storage.partial_path(url).expect("map url");
    std::fs::metadata(partial).ok().map(|meta| meta.len())
}

/// Contents of the committed artifact for `url`.
#[must_use]
pub fn artifact_bytes(storage: &FileCacheStorage, url: &str) -> Option<Vec<u8>> {
    std::fs::read(storage.artifact_path(url).expect("map url")).ok()
}
