//! Constants for the download module (timeouts, transfer tuning).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large files).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Size of one body chunk written to the sink per loop iteration.
pub const CHUNK_SIZE: usize = 4096;

/// Minimum wall-clock gap between two throttled progress notifications.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(300);

/// Free space the cache volume must keep before a transfer may write (20 MiB).
pub const MIN_FREE_SPACE_BYTES: u64 = 20 * 1024 * 1024;

/// Range header value used by the size probe: the first six bytes only.
pub const PROBE_RANGE: &str = "bytes=0-5";
