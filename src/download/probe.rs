//! Remote size discovery.
//!
//! A probe asks for the first six bytes only and reads the complete length
//! from `Content-Range`, so learning the size never pulls the whole body.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use super::HttpClient;
use super::constants::PROBE_RANGE;
use super::content_range::instance_length_from_headers;

const UNKNOWN: u64 = u64::MAX;

/// Total length learned for a downloader instance.
///
/// Starts unknown. Once a value is learned it can be replaced by a newer
/// value but never reset to unknown.
#[derive(Debug)]
pub(crate) struct KnownLength(AtomicU64);

impl Default for KnownLength {
    fn default() -> Self {
        Self(AtomicU64::new(UNKNOWN))
    }
}

impl KnownLength {
    pub(crate) fn get(&self) -> Option<u64> {
        match self.0.load(Ordering::Acquire) {
            UNKNOWN => None,
            total => Some(total),
        }
    }

    pub(crate) fn learn(&self, total: u64) {
        if total != UNKNOWN {
            self.0.store(total, Ordering::Release);
        }
    }
}

/// Issues one size probe against `url`.
///
/// Returns `None` on transport failure or when the response carries no usable
/// `Content-Range` total.
pub(crate) async fn probe_instance_length(client: &HttpClient, url: &str) -> Option<u64> {
    match client.get_range(url, PROBE_RANGE).await {
        Ok(response) => {
            let total = instance_length_from_headers(response.headers());
            if total.is_none() {
                debug!(url = %url, status = response.status().as_u16(), "probe response has no usable Content-Range");
            }
            total
        }
        Err(error) => {
            debug!(url = %url, error = %error, "size probe failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_length_starts_unknown() {
        assert_eq!(KnownLength::default().get(), None);
    }

    #[test]
    fn test_known_length_is_never_unlearned() {
        let known = KnownLength::default();
        known.learn(1000);
        assert_eq!(known.get(), Some(1000));

        known.learn(UNKNOWN);
        assert_eq!(known.get(), Some(1000));

        known.learn(2000);
        assert_eq!(known.get(), Some(2000));
    }

    #[test]
    fn test_known_length_accepts_zero() {
        let known = KnownLength::default();
        known.learn(0);
        assert_eq!(known.get(), Some(0));
    }
}
