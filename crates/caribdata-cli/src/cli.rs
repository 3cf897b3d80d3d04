use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "caribdata", about = "Build tidy Caribbean datasets from public sources")]
pub struct Cli {
    /// Path to the catalog file.
    #[arg(long, global = true, default_value = "catalog.yml")]
    pub config: PathBuf,

    /// Exit non-zero when any fetch error was recorded.
    #[arg(long, global = true)]
    pub strict: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the API-backed sources (World Bank, FAOSTAT) and write tidy CSVs.
    Build,
    /// Harvest the configured messy spreadsheets and produce the bundle.
    Messy,
    /// Run the full pipeline: build, then messy.
    All,
}
