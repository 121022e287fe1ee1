//! Configuration types for runtime and execution settings

/// Runtime configuration for tokio and thread pools
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeConfig {
    /// Number of worker threads (0 = number of CPU cores)
    pub max_workers: usize,
    /// Number of blocking threads (0 = tokio default of 512)
    pub max_blocking_threads: usize,
}

impl RuntimeConfig {
    pub fn build(&self) -> std::io::Result<tokio::runtime::Runtime> {
        let mut builder = tokio::runtime::Builder::new_multi_thread();
        builder.enable_all();
        if self.max_workers > 0 {
            builder.worker_threads(self.max_workers);
        }
        if self.max_blocking_threads > 0 {
            builder.max_blocking_threads(self.max_blocking_threads);
        }
        builder.build()
    }
}

/// Output and logging configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Suppress error output
    pub quiet: bool,
    /// Verbosity level: 0=ERROR, 1=INFO, 2=DEBUG, 3=TRACE
    pub verbose: u8,
    /// Print summary statistics at the end
    pub print_summary: bool,
}

impl OutputConfig {
    /// Default log filter directive for the configured verbosity.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "error",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Profiling configuration, each sink captures the whole run
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Chrome trace JSON output path (viewable in Perfetto or chrome://tracing)
    pub chrome_trace: Option<std::path::PathBuf>,
    /// Folded stacks output path (convertible to SVG with `inferno-flamegraph`)
    pub flamegraph: Option<std::path::PathBuf>,
    /// Span level captured by the profiling sinks, e.g. "trace" or "info"
    pub profile_level: Option<String>,
}

impl TracingConfig {
    pub fn profiling_enabled(&self) -> bool {
        self.chrome_trace.is_some() || self.flamegraph.is_some()
    }
}
