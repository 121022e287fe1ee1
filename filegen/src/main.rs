use anyhow::{Context, Result};
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "filegen",
    version,
    about = "Generate a flat directory of random files for benchmarking fcp",
    long_about = "`filegen` creates ROOT/filegen and fills it with NUMFILES files of FILESIZE random bytes each.

EXAMPLE:
    # 1000 files of 4 MiB each, then copy them with 8 workers
    filegen /tmp 1000 4MiB
    fcp /tmp/filegen /mnt/target --iodepth 8"
)]
struct Args {
    /// Root directory where files are generated
    #[arg()]
    root: std::path::PathBuf,

    /// Number of files to generate
    #[arg()]
    numfiles: usize,

    /// Size of each file. Accepts suffixes like "1K", "1MiB", "1G"
    #[arg()]
    filesize: bytesize::ByteSize,

    /// Size of the buffer used to write to each file. Accepts suffixes like "1K", "1MiB", "1G"
    #[arg(long, default_value = "4K", value_name = "SIZE")]
    bufsize: bytesize::ByteSize,

    /// Maximum number of files being written at the same time, 0 means no limit
    #[arg(long, default_value = "256", value_name = "N")]
    max_open_files: usize,

    /// Print summary at the end
    #[arg(long)]
    summary: bool,

    /// Verbose level (implies "summary"): -v INFO / -vv DEBUG / -vvv TRACE (default: ERROR)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode, don't report errors
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,

    /// Number of worker threads, 0 means number of cores
    #[arg(long, default_value = "0", value_name = "N")]
    max_workers: usize,
}

async fn async_main(args: Args) -> Result<common::filegen::Summary> {
    let root = args.root.join("filegen");
    tokio::fs::create_dir(&root)
        .await
        .with_context(|| format!("Error creating {:?}", &root))?;
    let summary = common::filegen::filegen(
        &root,
        args.numfiles,
        args.filesize.as_u64() as usize,
        args.bufsize.as_u64() as usize,
        args.max_open_files,
    )
    .await?;
    Ok(summary)
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
        max_blocking_threads: 0,
    };
    let res = common::run(output, runtime, common::TracingConfig::default(), func);
    if res.is_none() {
        std::process::exit(1);
    }
    Ok(())
}
