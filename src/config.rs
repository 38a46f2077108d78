//! File configuration for downloader defaults.
//!
//! Values come from a TOML file; every key is optional and unknown keys are
//! rejected. The command-line tool layers its flags over whatever is set here.
//!
//! ```toml
//! cache_dir = "/var/cache/resources"
//! connect_timeout_secs = 10
//! read_timeout_secs = 120
//! chunk_size = 8192
//! progress_interval_ms = 500
//! min_free_space_mib = 64
//! ```

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::download::DownloadOptions;
use crate::download::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};

const APP_DIR: &str = "resource-downloader";
const CONFIG_FILE: &str = "config.toml";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("failed to read config file '{path}': {source}")]
    Read {
        /// The config file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`FileConfig`].
    #[error("failed to parse config: {source}")]
    Parse {
        /// The underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A value parsed but falls outside its allowed range.
    #[error("invalid config value for `{field}`: {value}. Expected range: {expected}")]
    OutOfRange {
        /// The offending key.
        field: &'static str,
        /// The rejected value.
        value: u64,
        /// Human-readable allowed range.
        expected: &'static str,
    },
}

/// TOML-backed file configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Cache root directory.
    pub cache_dir: Option<PathBuf>,
    /// HTTP connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// HTTP read timeout in seconds.
    pub read_timeout_secs: Option<u64>,
    /// Bytes written per loop iteration.
    pub chunk_size: Option<u64>,
    /// Minimum milliseconds between progress notifications.
    pub progress_interval_ms: Option<u64>,
    /// Free-space floor on the cache volume, in MiB.
    pub min_free_space_mib: Option<u64>,
}

impl FileConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys, and
    /// [`ConfigError::OutOfRange`] for values outside their range.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|source| ConfigError::Parse { source })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates config values against runtime constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfRange`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("connect_timeout_secs", self.connect_timeout_secs, 1, 3600, "1..=3600")?;
        check_range("read_timeout_secs", self.read_timeout_secs, 1, 3600, "1..=3600")?;
        check_range("chunk_size", self.chunk_size, 1, 1024 * 1024, "1..=1048576")?;
        check_range("progress_interval_ms", self.progress_interval_ms, 0, 60_000, "0..=60000")?;
        check_range("min_free_space_mib", self.min_free_space_mib, 0, 1024 * 1024, "0..=1048576")?;
        Ok(())
    }

    /// Connect and read timeouts in seconds, defaulted where unset.
    #[must_use]
    pub fn timeouts(&self) -> (u64, u64) {
        (
            self.connect_timeout_secs.unwrap_or(CONNECT_TIMEOUT_SECS),
            self.read_timeout_secs.unwrap_or(READ_TIMEOUT_SECS),
        )
    }

    /// Transfer tuning with unset values taken from [`DownloadOptions::default`].
    #[must_use]
    pub fn download_options(&self) -> DownloadOptions {
        let defaults = DownloadOptions::default();
        DownloadOptions {
            chunk_size: self
                .chunk_size
                .and_then(|size| usize::try_from(size).ok())
                .unwrap_or(defaults.chunk_size),
            progress_interval: self
                .progress_interval_ms
                .map_or(defaults.progress_interval, Duration::from_millis),
            min_free_space: self
                .min_free_space_mib
                .map_or(defaults.min_free_space, |mib| mib * 1024 * 1024),
        }
    }
}

fn check_range(
    field: &'static str,
    value: Option<u64>,
    min: u64,
    max: u64,
    expected: &'static str,
) -> Result<(), ConfigError> {
    match value {
        Some(value) if !(min..=max).contains(&value) => Err(ConfigError::OutOfRange {
            field,
            value,
            expected,
        }),
        _ => Ok(()),
    }
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/resource-downloader/config.toml`
/// 2. `$HOME/.config/resource-downloader/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config_home).join(APP_DIR).join(CONFIG_FILE));
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILE),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from `path`; a missing file yields defaults.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file exists but cannot be read, parsed or validated.
pub fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(FileConfig::default()),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    FileConfig::from_toml_str(&raw)
}

/// Loads config from the default path if present.
///
/// # Errors
///
/// Same as [`load_file_config`].
pub fn load_default_file_config() -> Result<FileConfig, ConfigError> {
    match resolve_default_config_path() {
        Some(path) => load_file_config(&path),
        None => Ok(FileConfig::default()),
    }
}
