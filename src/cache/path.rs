//! URL to cache-path mapping.
//!
//! A URL maps to `<host>/<path segments...>`, relative to the cache root.
//! Query strings and fragments do not take part in the mapping.

use std::path::{Component, Path, PathBuf};

use url::Url;

use super::error::StorageError;

/// Maps a URL to its stable storage path relative to the cache root.
///
/// # Errors
///
/// - [`StorageError::InvalidUrl`] if the URL does not parse
/// - [`StorageError::MissingHost`] if it has no host
/// - [`StorageError::MissingPath`] if the path has no file name (e.g. `/` or `/dir/`)
/// - [`StorageError::UnsafeSegment`] if a segment would escape the cache root
pub fn cache_path(url: &str) -> Result<PathBuf, StorageError> {
    let parsed = Url::parse(url).map_err(|_| StorageError::invalid_url(url))?;
    let host = parsed
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| StorageError::missing_host(url))?;

    let segments: Vec<&str> = parsed
        .path_segments()
        .map(Iterator::collect)
        .unwrap_or_default();
    match segments.last() {
        Some(last) if !last.is_empty() => {}
        _ => return Err(StorageError::missing_path(url)),
    }

    let mut path = PathBuf::from(host);
    for segment in segments.into_iter().filter(|segment| !segment.is_empty()) {
        if !is_safe_segment(segment) {
            return Err(StorageError::unsafe_segment(url, segment));
        }
        path.push(segment);
    }
    Ok(path)
}

/// Returns the suffix after the final dot of the URL's last path segment.
///
/// `None` when the URL does not parse, the last segment has no dot, or the dot
/// is the segment's final character.
#[must_use]
pub fn extension(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last_segment = parsed.path_segments()?.next_back()?;
    let (_, ext) = last_segment.rsplit_once('.')?;
    (!ext.is_empty()).then(|| ext.to_string())
}

fn is_safe_segment(segment: &str) -> bool {
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
