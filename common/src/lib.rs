//! Common utilities and types for the fcp tools
//!
//! This crate provides the engine behind `fcp`, a tool that copies every file of a single
//! directory into `<destination>/<directory name>` using a fixed number of concurrent workers and
//! reports the effective throughput. It also hosts the shared runtime, logging and profiling setup
//! used by the binaries.
//!
//! # Core Modules
//!
//! - [`listing`] - non-recursive listing of the source directory
//! - [`partition`] - static striding of the listing across workers
//! - [`copy`] - copy workers and the result aggregator
//! - [`filegen`] - generation of flat test filesets for benchmarking
//!
//! # Usage
//!
//! Binaries build their configuration from command line arguments and hand an async closure to
//! [`run`], which sets up tracing, builds the tokio runtime and prints the outcome:
//!
//! ```rust,no_run
//! let settings = common::copy::Settings {
//!     workers: 4,
//!     timeout: None,
//! };
//! let report = common::run(
//!     common::OutputConfig::default(),
//!     common::RuntimeConfig::default(),
//!     common::TracingConfig::default(),
//!     || async move {
//!         common::copy::copy(
//!             std::path::Path::new("/data/in"),
//!             std::path::Path::new("/data/out"),
//!             &settings,
//!         )
//!         .await
//!     },
//! );
//! ```

use anyhow::Context;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub mod config;
pub mod copy;
pub mod filegen;
pub mod listing;
pub mod partition;

#[cfg(test)]
mod testutils;

pub use config::{OutputConfig, RuntimeConfig, TracingConfig};

/// Keeps profiling sinks alive; dropping it flushes them to disk.
struct ProfileGuards {
    _chrome: Option<tracing_chrome::FlushGuard>,
    _flame: Option<tracing_flame::FlushGuard<std::io::BufWriter<std::fs::File>>>,
}

fn setup_tracing(output: &OutputConfig, tracing: &TracingConfig) -> anyhow::Result<ProfileGuards> {
    let fmt_layer = if output.quiet {
        None
    } else {
        // RUST_LOG takes precedence over -v
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(output.log_level()));
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
    };
    let profile_level = tracing
        .profile_level
        .as_deref()
        .unwrap_or("trace")
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .with_context(|| format!("invalid profile level {:?}", &tracing.profile_level))?;
    let (chrome_layer, chrome_guard) = match &tracing.chrome_trace {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("cannot create chrome trace file {path:?}"))?;
            let (layer, guard) = tracing_chrome::ChromeLayerBuilder::new()
                .writer(file)
                .include_args(true)
                .build();
            (Some(layer.with_filter(profile_level)), Some(guard))
        }
        None => (None, None),
    };
    let (flame_layer, flame_guard) = match &tracing.flamegraph {
        Some(path) => {
            let (layer, guard) = tracing_flame::FlameLayer::with_file(path)
                .with_context(|| format!("cannot create flamegraph file {path:?}"))?;
            (Some(layer.with_filter(profile_level)), Some(guard))
        }
        None => (None, None),
    };
    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(chrome_layer)
        .with(flame_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;
    if tracing.profiling_enabled() {
        ::tracing::info!(
            "profiling at {profile_level}, chrome trace: {:?}, flamegraph: {:?}",
            tracing.chrome_trace,
            tracing.flamegraph
        );
    }
    Ok(ProfileGuards {
        _chrome: chrome_guard,
        _flame: flame_guard,
    })
}

/// Run `func` on a tokio runtime built from `runtime`, with logging and profiling configured.
///
/// Returns the summary on success. Errors are logged (unless `quiet`) and yield `None`, callers
/// map that to a failing exit code.
pub fn run<Fut, Summary, Error>(
    output: OutputConfig,
    runtime: RuntimeConfig,
    tracing: TracingConfig,
    func: impl FnOnce() -> Fut,
) -> Option<Summary>
where
    Summary: std::fmt::Display,
    Error: std::fmt::Display,
    Fut: std::future::Future<Output = Result<Summary, Error>>,
{
    // profiling sinks are flushed when this goes out of scope, after the final report
    let _guards = match setup_tracing(&output, &tracing) {
        Ok(guards) => guards,
        Err(error) => {
            if !output.quiet {
                eprintln!("{error:#}");
            }
            return None;
        }
    };
    let runtime = match runtime.build() {
        Ok(runtime) => runtime,
        Err(error) => {
            tracing::error!("failed to start tokio runtime: {:#}", &error);
            return None;
        }
    };
    let res = runtime.block_on(func());
    // workers abandoned after a timeout may still be blocked in I/O, don't wait for them
    runtime.shutdown_background();
    match res {
        Ok(summary) => {
            if output.print_summary || output.verbose > 0 {
                println!("{summary}");
            }
            Some(summary)
        }
        Err(error) => {
            tracing::error!("{:#}", &error);
            None
        }
    }
}
