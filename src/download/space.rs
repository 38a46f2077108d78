//! Free-space gate for the volume backing the cache.

use std::fmt;
use std::path::Path;

use tracing::warn;

/// Source of free-space figures for a path's volume.
pub trait SpaceProbe: Send + Sync {
    /// Bytes available to unprivileged writers on the volume holding `path`.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error when the volume cannot be queried.
    fn available_space(&self, path: &Path) -> std::io::Result<u64>;
}

/// Queries the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct VolumeSpace;

impl SpaceProbe for VolumeSpace {
    fn available_space(&self, path: &Path) -> std::io::Result<u64> {
        fs2::available_space(path)
    }
}

/// Reports a fixed amount of free space regardless of path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSpace(pub u64);

impl SpaceProbe for FixedSpace {
    fn available_space(&self, _path: &Path) -> std::io::Result<u64> {
        Ok(self.0)
    }
}

/// Result of one free-space check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceCheck {
    /// At least the floor is free.
    Sufficient,
    /// Below the floor; carries the free bytes observed (0 when the query failed).
    Insufficient { available: u64 },
}

impl fmt::Display for SpaceCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sufficient => f.write_str("sufficient"),
            Self::Insufficient { available } => write!(f, "insufficient ({available} bytes free)"),
        }
    }
}

/// True when `available` meets the floor; exactly `floor` bytes passes.
#[must_use]
pub fn meets_floor(available: u64, floor: u64) -> bool {
    available >= floor
}

/// Checks the volume holding `path` against `floor` bytes.
///
/// A failed query counts as insufficient space.
pub fn check_space(probe: &dyn SpaceProbe, path: &Path, floor: u64) -> SpaceCheck {
    match probe.available_space(path) {
        Ok(available) if meets_floor(available, floor) => SpaceCheck::Sufficient,
        Ok(available) => SpaceCheck::Insufficient { available },
        Err(error) => {
            warn!(path = %path.display(), error = %error, "free space query failed");
            SpaceCheck::Insufficient { available: 0 }
        }
    }
}
