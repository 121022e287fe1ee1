use anyhow::Result;
use clap::Parser;
use tracing::instrument;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "fcp",
    version,
    about = "Copy a directory's files using a fixed set of concurrent workers and report throughput",
    long_about = "`fcp` copies every file directly inside SRC into DST/<name of SRC>, striping the files \
across a fixed number of concurrent workers, and reports the amount of data copied and the effective \
throughput.

Only the top-level entries of SRC are considered: sub-directories are skipped, not recursed into.
File contents and mode bits are copied. A file that cannot be read or written is reported and
counted, the remaining files are still copied.

EXIT CODES:
    0 - Copy completed (possibly with per-file failures, see the report line)
    1 - Setup failed (bad arguments, SRC missing, DST/<name> exists or cannot be created) or timed out

EXAMPLES:
    # Copy /data/in into /data/out/in with 8 workers
    fcp /data/in /data/out --iodepth 8

    # Same, capturing a Chrome trace of the run
    fcp /data/in /data/out -j 8 --chrome-trace /tmp/fcp.json"
)]
struct Args {
    // Copy options
    /// Number of concurrent copy workers (must be at least 1)
    #[arg(
        short = 'j',
        long,
        default_value = "1",
        value_name = "N",
        help_heading = "Copy options"
    )]
    iodepth: usize,

    /// Stop waiting for workers after this long and fail
    ///
    /// By default fcp waits for every worker to finish, however long that takes.
    /// This option accepts a human readable duration, e.g. "30s", "5min" etc.
    #[arg(long, value_name = "DURATION", help_heading = "Copy options")]
    timeout: Option<humantime::Duration>,

    // Progress & output
    /// Print summary at the end
    #[arg(long, help_heading = "Progress & output")]
    summary: bool,

    /// Verbose level (implies "summary"): -v INFO / -vv DEBUG / -vvv TRACE (default: ERROR)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, help_heading = "Progress & output")]
    verbose: u8,

    /// Quiet mode, don't report errors or the final throughput line
    #[arg(short = 'q', long = "quiet", help_heading = "Progress & output")]
    quiet: bool,

    // Advanced settings
    /// Number of runtime worker threads, 0 means number of cores
    ///
    /// This sizes the scheduler, independently of --iodepth.
    #[arg(
        long,
        default_value = "0",
        value_name = "N",
        help_heading = "Advanced settings"
    )]
    max_workers: usize,

    /// Number of blocking worker threads, 0 means Tokio runtime default (512)
    #[arg(
        long,
        default_value = "0",
        value_name = "N",
        help_heading = "Advanced settings"
    )]
    max_blocking_threads: usize,

    // Profiling options
    /// Write a Chrome trace of the whole run to PATH
    ///
    /// Viewable in Perfetto UI (ui.perfetto.dev) or chrome://tracing.
    #[arg(long, value_name = "PATH", help_heading = "Profiling")]
    chrome_trace: Option<std::path::PathBuf>,

    /// Write folded stacks of the whole run to PATH
    ///
    /// Convert to SVG: cat PATH | inferno-flamegraph > flamegraph.svg
    #[arg(long, value_name = "PATH", help_heading = "Profiling")]
    flamegraph: Option<std::path::PathBuf>,

    /// Log level for profiling (chrome-trace, flamegraph)
    ///
    /// Values: trace, debug, info, warn, error
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "trace",
        help_heading = "Profiling"
    )]
    profile_level: String,

    // ARGUMENTS
    /// Directory whose files are copied
    #[arg()]
    src: std::path::PathBuf,

    /// Destination root, the copy lands in DST/<name of SRC>
    #[arg()]
    dst: std::path::PathBuf,
}

#[instrument]
async fn async_main(args: Args) -> Result<common::copy::Report> {
    let settings = common::copy::Settings {
        workers: args.iodepth,
        timeout: args.timeout.map(Into::into),
    };
    let report = match common::copy::copy(&args.src, &args.dst, &settings).await {
        Ok(report) => report,
        Err(common::copy::Error::Timeout {
            timeout,
            outstanding,
            summary,
        }) => {
            if args.summary {
                println!("{summary}");
            }
            return Err(anyhow::anyhow!(
                "timed out after {} waiting for {} worker(s)",
                humantime::format_duration(timeout),
                outstanding
            ));
        }
        Err(error) => return Err(error.into()),
    };
    if !args.quiet {
        println!("{}", report.headline());
    }
    Ok(report)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let func = {
        let args = args.clone();
        || async_main(args)
    };
    let output = common::OutputConfig {
        quiet: args.quiet,
        verbose: args.verbose,
        print_summary: args.summary,
    };
    let runtime = common::RuntimeConfig {
        max_workers: args.max_workers,
        max_blocking_threads: args.max_blocking_threads,
    };
    let tracing = common::TracingConfig {
        chrome_trace: args.chrome_trace,
        flamegraph: args.flamegraph,
        profile_level: Some(args.profile_level),
    };
    let res = common::run(output, runtime, tracing, func);
    if res.is_none() {
        std::process::exit(1);
    }
    Ok(())
}
