//! CLI entry point for the resource downloader.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use resource_downloader::cache::{FileCacheStorage, extension};
use resource_downloader::config::{FileConfig, load_default_file_config, load_file_config};
use resource_downloader::{
    ChannelObserver, DownloadEvent, ErrorKind, HttpClient, PauseHandle, ResumableDownloader,
};
use tracing::{debug, info, warn};

mod cli;

use cli::{Args, Command};

/// Cache root used when neither the flag nor the config file sets one.
const DEFAULT_CACHE_DIR: &str = "resource-cache";

/// Exit status after a second Ctrl+C (128 + SIGINT).
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let config = match args.config.as_deref() {
        Some(path) => load_file_config(path)
            .with_context(|| format!("Failed to load config file '{}'", path.display()))?,
        None => load_default_file_config().context("Failed to load default config file")?,
    };

    let cache_dir = args
        .cache_dir
        .clone()
        .or_else(|| config.cache_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR));
    let storage = Arc::new(FileCacheStorage::new(cache_dir));

    match args.command {
        Command::Fetch { url } => fetch(&config, storage, url, args.quiet).await,
        Command::Size { url } => size(&config, storage, &url).await,
        Command::Path { url } => path(&storage, &url),
    }
}

fn build_downloader(config: &FileConfig, storage: Arc<FileCacheStorage>) -> ResumableDownloader {
    let (connect_secs, read_secs) = config.timeouts();
    ResumableDownloader::new(HttpClient::new_with_timeouts(connect_secs, read_secs), storage)
        .with_options(config.download_options())
}

async fn fetch(
    config: &FileConfig,
    storage: Arc<FileCacheStorage>,
    url: String,
    quiet: bool,
) -> Result<()> {
    let (observer, mut events) = ChannelObserver::channel();
    let downloader = build_downloader(config, Arc::clone(&storage)).with_observer(Arc::new(observer));

    let pause = downloader.pause_handle();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if on_interrupt(&pause) == Interrupt::Exit {
                std::process::exit(INTERRUPTED_EXIT_CODE);
            }
        }
    });

    let bar = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(0)
    };
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner} [{bar:40}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    // The downloader (and with it the observer) is dropped when the task ends,
    // which closes the event stream below.
    let task_url = url.clone();
    let task = tokio::spawn(async move { downloader.download(&task_url).await });

    while let Some(event) = events.recv().await {
        match event {
            DownloadEvent::Progress(progress) => {
                if let Some(total) = progress.total {
                    bar.set_length(total);
                }
                bar.set_position(progress.loaded);
            }
            DownloadEvent::Succeeded(total) => bar.finish_with_message(format!("{total} bytes")),
            DownloadEvent::Failed { .. } => bar.abandon(),
            DownloadEvent::BytesReceived(_) => {}
        }
    }

    match task.await.context("download task panicked")? {
        Ok(total) => {
            let cached = storage.artifact_path(&url)?;
            info!(bytes = total, path = %cached.display(), "cached");
            println!("{}", cached.display());
            Ok(())
        }
        Err(error) => {
            let kind = error.kind();
            if let Some(hint) = resume_hint(kind) {
                info!("{hint}");
            }
            Err(error).with_context(|| format!("download failed ({kind})"))
        }
    }
}

/// Hint printed after a failure that kept its partial bytes.
fn resume_hint(kind: ErrorKind) -> Option<&'static str> {
    kind.preserves_partial_data()
        .then_some("partial data kept; run the same command again to resume")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Pause,
    Exit,
}

/// First Ctrl+C pauses the transfer; a second one while paused exits.
fn on_interrupt(pause: &PauseHandle) -> Interrupt {
    if pause.is_paused() {
        warn!("second interrupt received; exiting without waiting for the transfer");
        return Interrupt::Exit;
    }
    warn!("interrupt received; pausing after the current chunk (press Ctrl+C again to exit)");
    pause.pause();
    Interrupt::Pause
}

async fn size(config: &FileConfig, storage: Arc<FileCacheStorage>, url: &str) -> Result<()> {
    let downloader = build_downloader(config, storage);
    match downloader.probe_size(url).await {
        Some(total) => println!("{total}"),
        None => println!("unknown"),
    }
    Ok(())
}

fn path(storage: &FileCacheStorage, url: &str) -> Result<()> {
    let artifact = storage
        .artifact_path(url)
        .with_context(|| format!("Cannot map '{url}' into the cache"))?;
    println!("{}", artifact.display());
    println!("{}", extension(url).unwrap_or_else(|| "-".to_string()));
    Ok(())
}
