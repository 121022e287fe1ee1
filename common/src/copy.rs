//! Striped copy of a directory's top-level files
//!
//! [`copy`] lists the source directory once, creates `<dst_root>/<source basename>` and fans the
//! listing out over a fixed number of workers (see [`crate::partition`]). Each worker copies its
//! share through its own buffer and hands a single [`Summary`] back over a oneshot channel; the
//! aggregator sums those in whatever order they arrive and derives the throughput.
//!
//! Errors are split in two tiers:
//! - setup errors (bad worker count, missing source, listing or mkdir failure) abort the whole
//!   operation before any file is copied and are returned as [`Error`]
//! - per-file errors are logged by the worker and counted in [`Summary::files_failed`], the run
//!   carries on

use std::os::unix::fs::PermissionsExt;

use anyhow::{Context, anyhow};
use futures::StreamExt;
use tracing::instrument;

use crate::listing;
use crate::partition;

pub mod worker;

pub use worker::BUFFER_SIZE;

const MIB: f64 = 1024.0 * 1024.0;

/// Error type for copy operations.
///
/// The Display implementation shows the full error chain of setup failures, so log it with any
/// format specifier.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] partition::Error),
    #[error("{source:#}")]
    Setup {
        #[source]
        source: anyhow::Error,
    },
    #[error("timed out after {timeout:?} waiting for {outstanding} worker(s)")]
    Timeout {
        timeout: std::time::Duration,
        outstanding: usize,
        /// Sum of the results of workers that did report before the deadline.
        summary: Summary,
    },
}

impl Error {
    fn setup(source: anyhow::Error) -> Self {
        Error::Setup { source }
    }
}

#[derive(Debug, Copy, Clone)]
pub struct Settings {
    /// Number of concurrent copy workers, must be at least 1.
    pub workers: usize,
    /// Give up waiting for workers after this long. `None` waits forever.
    pub timeout: Option<std::time::Duration>,
}

impl Settings {
    pub fn validate(&self) -> Result<(), Error> {
        if self.workers == 0 {
            return Err(partition::Error::NoWorkers.into());
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub bytes_copied: u64,
    pub files_copied: usize,
    pub directories_skipped: usize,
    pub files_failed: usize,
}

impl std::ops::Add for Summary {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            bytes_copied: self.bytes_copied + other.bytes_copied,
            files_copied: self.files_copied + other.files_copied,
            directories_skipped: self.directories_skipped + other.directories_skipped,
            files_failed: self.files_failed + other.files_failed,
        }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "bytes copied: {}\n\
            files copied: {}\n\
            directories skipped: {}\n\
            files failed: {}",
            bytesize::ByteSize(self.bytes_copied),
            self.files_copied,
            self.directories_skipped,
            self.files_failed,
        )
    }
}

/// Aggregate result of a completed run.
#[derive(Copy, Clone, Debug)]
pub struct Report {
    pub summary: Summary,
    /// Wall-clock time from launching the first worker to receiving the last result.
    pub elapsed: std::time::Duration,
    /// Workers that went away without reporting (their task panicked).
    ///
    /// Only non-zero for library users built with `panic = "unwind"`, the `fcp` binaries abort
    /// on panic.
    pub workers_lost: usize,
}

impl Report {
    pub fn megabytes(&self) -> f64 {
        self.summary.bytes_copied as f64 / MIB
    }

    /// MB/s over the whole run, 0 when the run took no measurable time.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.megabytes() / secs
        } else {
            0.0
        }
    }

    /// The one-line result printed at the end of a run.
    pub fn headline(&self) -> String {
        let mut line = format!(
            "Copied {:.2} MB @ {:.2} MB/s",
            self.megabytes(),
            self.throughput()
        );
        if self.summary.files_failed > 0 {
            line.push_str(&format!(", {} file(s) failed", self.summary.files_failed));
        }
        line
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}\n\
            workers lost: {}\n\
            elapsed: {:.2?}\n\
            throughput: {:.2} MB/s",
            &self.summary,
            self.workers_lost,
            self.elapsed,
            self.throughput(),
        )
    }
}

/// `<dst_root>/<basename of src>`
async fn destination_dir(
    src: &std::path::Path,
    dst_root: &std::path::Path,
) -> Result<std::path::PathBuf, Error> {
    if let Some(name) = src.file_name() {
        return Ok(dst_root.join(name));
    }
    // e.g. "." or "foo/.." - resolve to find out what the directory is actually called
    let canonical = tokio::fs::canonicalize(src)
        .await
        .with_context(|| format!("failed resolving src path {src:?}"))
        .map_err(Error::setup)?;
    match canonical.file_name() {
        Some(name) => Ok(dst_root.join(name)),
        None => Err(Error::setup(anyhow!(
            "cannot determine directory name of src {src:?}"
        ))),
    }
}

#[instrument]
pub async fn copy(
    src: &std::path::Path,
    dst_root: &std::path::Path,
    settings: &Settings,
) -> Result<Report, Error> {
    settings.validate()?;
    tracing::debug!("reading source metadata");
    let src_metadata = tokio::fs::metadata(src)
        .await
        .with_context(|| format!("failed reading metadata from src: {src:?}"))
        .map_err(Error::setup)?;
    if !src_metadata.is_dir() {
        return Err(Error::setup(anyhow!("src {src:?} is not a directory")));
    }
    tracing::info!("getting file list...");
    let entries: std::sync::Arc<[listing::SourceEntry]> = listing::list_entries(src)
        .await
        .map_err(Error::setup)?
        .into();
    let dst = destination_dir(src, dst_root).await?;
    tracing::info!("creating output folder {dst:?}...");
    tokio::fs::DirBuilder::new()
        .mode(src_metadata.permissions().mode())
        .create(&dst)
        .await
        .with_context(|| format!("cannot create directory {dst:?}"))
        .map_err(Error::setup)?;
    let strides = partition::partition(entries.len(), settings.workers)?;
    let start = std::time::Instant::now();
    let mut pending = futures::stream::FuturesUnordered::new();
    for (id, stride) in strides.into_iter().enumerate() {
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        let task = worker::Worker {
            id,
            stride,
            entries: entries.clone(),
            src: src.to_owned(),
            dst: dst.clone(),
        };
        tokio::spawn(task.run(done_tx));
        pending.push(done_rx);
    }
    tracing::debug!("launched {} workers", pending.len());
    let deadline = settings
        .timeout
        .map(|timeout| (timeout, tokio::time::Instant::now() + timeout));
    let mut summary = Summary::default();
    let mut workers_lost = 0;
    loop {
        let next = match deadline {
            Some((timeout, at)) => match tokio::time::timeout_at(at, pending.next()).await {
                Ok(next) => next,
                Err(_) => {
                    tracing::error!(
                        "gave up on {} worker(s) after {:?}",
                        pending.len(),
                        timeout
                    );
                    return Err(Error::Timeout {
                        timeout,
                        outstanding: pending.len(),
                        summary,
                    });
                }
            },
            None => pending.next().await,
        };
        let Some(result) = next else { break };
        match result {
            Ok(partial) => summary = summary + partial,
            Err(_) => {
                tracing::error!("a copy worker exited without reporting its result");
                workers_lost += 1;
            }
        }
    }
    let elapsed = start.elapsed();
    let report = Report {
        summary,
        elapsed,
        workers_lost,
    };
    tracing::info!("{}", report.headline());
    Ok(report)
}
