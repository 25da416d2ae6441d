use std::fs;
use std::path::PathBuf;

use clap::Parser;
use jiff::Timestamp;
use lloggs::LoggingArgs;
use tracing::info;

use fscatalog::{CatalogStore, ScanConfig, run_scan};

#[derive(Parser, Debug)]
#[command(name = "fscatalog")]
#[command(about = "Catalog filesystem trees for comparing a dataset across locations")]
struct Args {
    /// Filesystem root(s) to examine (can be specified multiple times)
    #[arg(long = "filesystem", short = 'f', value_name = "DIR")]
    filesystem: Vec<PathBuf>,

    /// Skip the file search stage
    #[arg(long, short = 'F')]
    skip_files: bool,

    /// Overwrite any existing database
    #[arg(long, short = 'o')]
    overwrite: bool,

    /// Release to examine, e.g. "dr15"
    release: String,

    /// Path to the catalog database file
    database: PathBuf,

    #[command(flatten)]
    logging: LoggingArgs,
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();
    let _guard = args.logging.setup(|v| match v {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    })?;

    let started = Timestamp::now();

    if args.overwrite && args.database.exists() {
        info!(database = ?args.database, "Removing existing database");
        fs::remove_file(&args.database)?;
    }

    let store = CatalogStore::open(&args.database)?;
    store.create_schema()?;

    let config = ScanConfig {
        roots: args.filesystem,
        release: args.release,
        skip_files: args.skip_files,
    };

    info!(roots = config.roots.len(), release = %config.release, "Building catalog");
    run_scan(&store, &config)?;

    let stats = store.stats()?;
    let elapsed_ms = Timestamp::now().as_millisecond() - started.as_millisecond();
    info!(elapsed_ms, "Catalog complete");

    eprintln!("Catalog written to {:?}", args.database);
    eprintln!("  Filesystems: {}", stats.filesystem_count);
    eprintln!("  Directories: {}", stats.directory_count);
    eprintln!(
        "  Files: {} ({} symlinks)",
        stats.file_count, stats.symlink_count
    );
    eprintln!("  Total size: {} bytes", stats.total_bytes);

    Ok(())
}
