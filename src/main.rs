mod database;
mod error;
mod etl;
mod ingest;
mod utils;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::database::repo::TransactionManager;
use crate::etl::driver::process_data;
use crate::etl::log_file::{self, LookupOptions};
use crate::etl::song_file;
use crate::utils::config::{self, Overrides};

#[derive(Parser, Debug)]
#[command(author, version, about = "Load song metadata and play logs into a SQLite star schema", long_about = None)]
struct Args {
    /// SQLite database file
    #[arg(short, long)]
    db_path: Option<PathBuf>,

    /// Root of the song metadata tree
    #[arg(short, long)]
    song_data: Option<PathBuf>,

    /// Root of the event log tree
    #[arg(short, long)]
    log_data: Option<PathBuf>,

    /// File extension of data files
    #[arg(short, long)]
    extension: Option<String>,

    /// Accept song matches whose duration differs by at most this many seconds
    #[arg(long)]
    duration_tolerance: Option<f64>,

    /// Drop and recreate all tables before loading
    #[arg(long)]
    reset: bool,

    /// Key=value file read before applying command line flags
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let settings = config::resolve(
        Overrides {
            db_path: args.db_path,
            song_data: args.song_data,
            log_data: args.log_data,
            extension: args.extension,
            duration_tolerance: args.duration_tolerance,
        },
        &args.env_file,
    )?;

    info!("Songplay ETL starting...");
    info!("DB: {:?}", settings.db_path);
    info!("Song data: {:?}", settings.song_data);
    info!("Log data: {:?}", settings.log_data);
    if settings.duration_tolerance > 0.0 {
        info!("Matching song durations within {}s", settings.duration_tolerance);
    }

    let mut tm = TransactionManager::new(&settings.db_path)?;
    if args.reset {
        tm.reset()?;
    }

    // Songs first, so play events can be matched against them.
    process_data(&mut tm, &settings.song_data, &settings.extension, song_file::process_song_file)?;

    let options = LookupOptions {
        duration_tolerance: settings.duration_tolerance,
    };
    let summaries = process_data(&mut tm, &settings.log_data, &settings.extension, |conn, stmts, path| {
        log_file::process_log_file(conn, stmts, path, options)
    })?;

    let records: usize = summaries.iter().map(|s| s.records).sum();
    let plays: usize = summaries.iter().map(|s| s.song_plays).sum();
    let matched: usize = summaries.iter().map(|s| s.matched).sum();
    info!(
        "{} log records read, {} song plays loaded, {} matched a known song",
        records, plays, matched
    );

    for (table, count) in tm.table_counts()? {
        info!("{}: {} rows", table, count);
    }

    info!("ETL completed.");
    Ok(())
}
