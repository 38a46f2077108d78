//! User-Agent string for transfer and probe requests.

/// Product token sent ahead of the crate version.
const PRODUCT: &str = "resource-downloader";

/// Default User-Agent for download and size-probe requests.
#[must_use]
pub(crate) fn default_download_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{PRODUCT}/{version} (resource-cache)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_carries_crate_version() {
        let ua = default_download_user_agent();
        assert_eq!(
            ua.strip_prefix("resource-downloader/")
                .and_then(|s| s.split(' ').next()),
            Some(env!("CARGO_PKG_VERSION")),
            "UA must contain crate version: {ua}"
        );
    }

    #[test]
    fn test_user_agent_identifies_cache_role() {
        let ua = default_download_user_agent();
        assert!(ua.ends_with("(resource-cache)"), "unexpected UA: {ua}");
    }
}
