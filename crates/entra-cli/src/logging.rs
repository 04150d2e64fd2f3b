//! Subscriber setup: colored console output on stderr plus a plain append-only
//! log file.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::Subscriber;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;

/// Level for a `-v` count.
pub fn level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Open `path` for appending, creating it if needed.
pub fn open_log_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file {}", path.display()))
}

/// Build the two-layer subscriber.
pub fn subscriber(verbose: u8, log_file: File) -> impl Subscriber + Send + Sync {
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false);
    let file = fmt::layer()
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .with_target(false);

    tracing_subscriber::registry()
        .with(level(verbose))
        .with(console)
        .with(file)
}

/// Install the subscriber for the rest of the process.
pub fn init(verbose: u8, path: &Path) -> Result<()> {
    let file = open_log_file(path)?;
    tracing::subscriber::set_global_default(subscriber(verbose, file))
        .context("a global tracing subscriber is already installed")
}
