//! pathreg - command line access to the UUID path registry.
//!
//! Wraps the `pathreg` library for shell use and for scripting a scan of a
//! profile directory.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pathreg::{JsonProfileSource, Registry, RegistrySettings, ScanSettings, StoreCleanup};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "pathreg")]
#[command(about = "Remember which file each UUID was last seen in")]
struct Args {
    /// Store base path (defaults to the platform config directory)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// First lock timeout in milliseconds
    #[arg(long, global = true)]
    lock_timeout_ms: Option<u64>,

    /// Delete every file sharing the store's name prefix on corruption
    #[arg(long, global = true)]
    prefix_cleanup: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record the file a UUID lives in
    Register { uuid: String, path: PathBuf },
    /// Print the file last registered for a UUID
    Lookup { uuid: String },
    /// Register every profile in a directory
    Scan {
        /// Directory to scan (defaults to the current directory)
        dir: Option<PathBuf>,
        /// Profile file extension, without the dot
        #[arg(long)]
        ext: Option<String>,
        /// Key holding the UUID inside a profile
        #[arg(long)]
        key: Option<String>,
    },
    /// Print the store and lock file locations
    Where,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let settings = build_settings(&args)?;
    debug!("Store base: {}", settings.store_base.display());
    let registry = Registry::new(settings);

    match args.command {
        Command::Register { uuid, path } => {
            let path = std::path::absolute(&path)
                .with_context(|| format!("Failed to resolve {}", path.display()))?;
            registry.register(&uuid, &path);
        }
        Command::Lookup { uuid } => match registry.lookup(&uuid) {
            Some(path) => println!("{}", path.display()),
            None => return Ok(ExitCode::FAILURE),
        },
        Command::Scan { dir, ext, key } => {
            let mut scan = ScanSettings::default();
            if let Some(ext) = ext {
                scan.extension = ext.trim_start_matches('.').to_string();
            }
            if let Some(key) = key {
                scan.uuid_key = key;
            }
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            let source = JsonProfileSource::new(cwd);
            let report = registry.scan_directory(dir.as_deref(), &source, &scan);
            println!(
                "registered={} skipped={} failed={}",
                report.registered.len(),
                report.skipped.len(),
                report.failed.len()
            );
        }
        Command::Where => {
            println!("store={}", registry.settings().db_path().display());
            println!("lock={}", registry.settings().lock_path().display());
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn build_settings(args: &Args) -> Result<RegistrySettings> {
    let mut settings = match &args.store {
        Some(base) => RegistrySettings::new(base),
        None => RegistrySettings::platform_default()
            .context("Failed to resolve the default store location")?,
    };

    if let Some(ms) = args.lock_timeout_ms {
        let first = Duration::from_millis(ms);
        // Keep the retry at the usual 3/5 of the first attempt
        let retry = first * 3 / 5;
        settings = settings.with_lock_timeouts(first, retry);
    }
    if args.prefix_cleanup {
        settings = settings.with_cleanup(StoreCleanup::Prefix);
    }

    Ok(settings)
}
