//! ferrite-scan - walk keys, hash fields, set members and sorted-set members
//! of a Ferrite/Redis server with SCAN cursors.
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use ferrite_scan::{BlockingCursor, Client, ClientConfig, CursorId, DataType, ScanExecutor, ScanOptions};
use tracing::debug;

/// ferrite-scan - incremental key-space and collection scans
#[derive(Parser, Debug)]
#[command(name = "ferrite-scan")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to connect to (overrides the config file)
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Port to connect to (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Glob pattern passed as MATCH
    #[arg(short, long = "match")]
    pattern: Option<String>,

    /// Batch-size hint passed as COUNT
    #[arg(long)]
    count: Option<u64>,

    /// Resume from this cursor token instead of starting over
    #[arg(long)]
    cursor: Option<String>,

    /// Stop after this many items and print the token to resume from
    #[arg(long)]
    limit: Option<u64>,

    /// Log level filter (e.g. "debug", "ferrite_scan=trace")
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// SCAN the key space
    Keys {
        /// Only keys of this type (string, list, set, zset, hash, stream)
        #[arg(short = 't', long = "type")]
        data_type: Option<DataType>,
    },
    /// HSCAN the fields of a hash
    Hscan { key: String },
    /// SSCAN the members of a set
    Sscan { key: String },
    /// ZSCAN the members of a sorted set
    Zscan { key: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(cli: &Cli) -> ferrite_scan::Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    };
    if let Some(host) = &cli.host {
        config.connection.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.connection.port = port;
    }
    config.validate()?;
    Ok(config)
}

fn scan_options(cli: &Cli) -> ferrite_scan::Result<ScanOptions> {
    let mut builder = ScanOptions::builder();
    if let Some(pattern) = &cli.pattern {
        builder = builder.pattern(pattern.as_str());
    }
    if let Some(count) = cli.count {
        builder = builder.count(count);
    }
    if let Command::Keys {
        data_type: Some(data_type),
    } = &cli.command
    {
        builder = builder.data_type(*data_type);
    }
    builder.build()
}

fn run(cli: &Cli) -> ferrite_scan::Result<()> {
    let config = load_config(cli)?;
    debug!(addr = %config.connection.addr(), "starting scan");
    let client = Client::connect_with(config)?;
    let options = scan_options(cli)?;
    let start = cli
        .cursor
        .clone()
        .map(CursorId::of)
        .unwrap_or_else(CursorId::initial);

    match &cli.command {
        Command::Keys { .. } => drain(client.scan_from(start, options)?, cli.limit, |key| {
            println!("{}", String::from_utf8_lossy(&key));
        }),
        Command::Hscan { key } => {
            let cursor = client.hscan_from(key.as_str(), start, options)?;
            drain(cursor, cli.limit, |entry| {
                println!(
                    "{}\t{}",
                    String::from_utf8_lossy(&entry.field),
                    String::from_utf8_lossy(&entry.value)
                );
            })
        }
        Command::Sscan { key } => {
            let cursor = client.sscan_from(key.as_str(), start, options)?;
            drain(cursor, cli.limit, |member| {
                println!("{}", String::from_utf8_lossy(&member));
            })
        }
        Command::Zscan { key } => {
            let cursor = client.zscan_from(key.as_str(), start, options)?;
            drain(cursor, cli.limit, |entry| {
                println!("{}\t{}", String::from_utf8_lossy(&entry.member), entry.score);
            })
        }
    }
}

/// Print items until the scan ends. With a `limit`, stop at the first batch
/// boundary after that many items and report the token to resume from on
/// stderr.
fn drain<E: ScanExecutor>(
    mut cursor: BlockingCursor<'_, E>,
    limit: Option<u64>,
    mut print: impl FnMut(E::Item),
) -> ferrite_scan::Result<()> {
    match limit {
        Some(limit) => {
            let limit = usize::try_from(limit).unwrap_or(usize::MAX);
            cursor.next_page(limit)?.into_iter().for_each(&mut print);
        }
        None => {
            for item in cursor.by_ref() {
                print(item?);
            }
        }
    }

    let scan = cursor.cursor();
    if !scan.cursor_id().is_finished() {
        eprintln!("resume with --cursor {}", scan.cursor_id());
    }
    cursor.close();
    Ok(())
}
