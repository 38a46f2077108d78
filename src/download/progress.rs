//! Progress events, their throttle, and the observer hooks a transfer reports through.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use super::error::ErrorKind;

/// Bytes persisted so far for a URL against its declared total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Initial offset plus bytes written this session.
    pub loaded: u64,
    /// Total declared by the server, `None` while unknown.
    pub total: Option<u64>,
}

impl ProgressEvent {
    /// Fraction complete in `0.0..=1.0`, when the total is known and non-zero.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            Some(total) if total > 0 => Some((self.loaded as f64 / total as f64).min(1.0)),
            _ => None,
        }
    }
}

/// Lets a progress notification through at most once per interval.
#[derive(Debug)]
pub(crate) struct ProgressThrottle {
    interval: Duration,
    last_emit: Instant,
}

impl ProgressThrottle {
    /// Starts the interval clock at `now`.
    pub(crate) fn starting_at(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last_emit: now,
        }
    }

    /// Returns true (and restarts the clock) when a full interval has elapsed since the last emit.
    pub(crate) fn ready(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last_emit) >= self.interval {
            self.last_emit = now;
            true
        } else {
            false
        }
    }
}

/// Hooks a transfer reports through.
///
/// All methods default to no-ops. They are invoked inline on the task running
/// `download`, so implementations should return quickly.
pub trait DownloadObserver: Send + Sync {
    /// A chunk of `len` bytes was written to the sink.
    fn on_bytes_received(&self, _len: u64) {}

    /// Throttled progress; `loaded` never decreases within one transfer.
    fn on_progress(&self, _event: ProgressEvent) {}

    /// The transfer was committed; fires at most once per transfer.
    fn on_success(&self, _total: u64) {}

    /// The transfer failed with a classified error.
    fn on_failure(&self, _url: &str, _kind: ErrorKind) {}
}

/// Observer that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl DownloadObserver for NoopObserver {}

/// One notification from a transfer, as delivered by [`ChannelObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadEvent {
    /// A chunk of this many bytes was written.
    BytesReceived(u64),
    /// Throttled progress.
    Progress(ProgressEvent),
    /// The transfer was committed with this total.
    Succeeded(u64),
    /// The transfer failed.
    Failed {
        /// URL of the failed transfer.
        url: String,
        /// Classified failure.
        kind: ErrorKind,
    },
}

/// Observer that forwards every notification into an unbounded channel.
///
/// Events keep the order in which the transfer emitted them. Sends to a
/// dropped receiver are ignored.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<DownloadEvent>,
}

impl ChannelObserver {
    /// Creates the observer together with the receiving end of its event stream.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DownloadEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: DownloadEvent) {
        let _ = self.tx.send(event);
    }
}

impl DownloadObserver for ChannelObserver {
    fn on_bytes_received(&self, len: u64) {
        self.send(DownloadEvent::BytesReceived(len));
    }

    fn on_progress(&self, event: ProgressEvent) {
        self.send(DownloadEvent::Progress(event));
    }

    fn on_success(&self, total: u64) {
        self.send(DownloadEvent::Succeeded(total));
    }

    fn on_failure(&self, url: &str, kind: ErrorKind) {
        self.send(DownloadEvent::Failed {
            url: url.to_string(),
            kind,
        });
    }
}
