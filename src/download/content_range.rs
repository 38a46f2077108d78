//! `Content-Range` header parsing.
//!
//! Servers reveal a resource's complete length reliably only through the
//! `<total>` part of `Content-Range: <unit> <start>-<end>/<total>`;
//! `Content-Length` on a ranged response describes the slice, not the resource.

use reqwest::header::{CONTENT_RANGE, HeaderMap};

/// Extracts the complete length from a `Content-Range` header value.
///
/// Returns `None` when the value has no `/`, the total is `*`, or the total
/// is not a valid integer.
#[must_use]
pub fn parse_instance_length(value: &str) -> Option<u64> {
    let (_, total) = value.rsplit_once('/')?;
    total.trim().parse::<u64>().ok()
}

/// Reads the complete length from a response's `Content-Range` header.
#[must_use]
pub fn instance_length_from_headers(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_RANGE)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_instance_length)
}
