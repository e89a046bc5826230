//! autosudoku command line.
//!
//! Scans a sequence of photos for a sudoku grid, prints which cells hold ink
//! and optionally dumps the rectified grids for inspection.

mod config;
mod report;
mod runner;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use config::Config;

#[derive(Parser)]
#[command(name = "autosudoku")]
#[command(about = "Locate sudoku grids in photos and extract the ink of each cell")]
#[command(version)]
struct Cli {
    /// Frames to scan, in stream order.
    #[arg(required = true)]
    frames: Vec<PathBuf>,

    /// Alternate configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write rectified grids and JSON reports to this directory.
    #[arg(long)]
    debug_dir: Option<PathBuf>,

    /// Scan every Nth frame (overrides the configuration).
    #[arg(long)]
    every: Option<u32>,

    /// Persist the effective configuration to the default location.
    #[arg(long)]
    save_config: bool,
}

fn main() -> Result<()> {
    // Structured logging. Use `RUST_LOG=info` etc.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = Config::load_or_default(cli.config.as_deref());
    if let Some(every) = cli.every {
        config.sample_every = every;
    }
    if cli.debug_dir.is_some() {
        config.debug_dir = cli.debug_dir;
    }
    if cli.save_config {
        let path = config.save()?;
        tracing::info!(path = ?path, "config saved");
    }

    let tally = runner::Runner::new(&config)?.run(&cli.frames)?;
    tracing::info!(
        scanned = tally.scanned,
        rejected = tally.rejected,
        skipped = tally.skipped,
        "done"
    );
    Ok(())
}
