//! Command-line arguments.

use clap::Parser;
use std::path::PathBuf;

use super::WriteMode;

/// Song and activity-log JSON to Parquet star schema ETL.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "sparkify-etl")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to an optional YAML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Input root holding `song_data/` and `log_data/`.
    #[arg(long, env = "SPARKIFY_INPUT_ROOT")]
    pub input: Option<String>,

    /// Output root receiving the five `<table>.parquet/` directories.
    #[arg(long, env = "SPARKIFY_OUTPUT_ROOT")]
    pub output: Option<String>,

    /// Behaviour when a table location already holds data.
    #[arg(long, env = "SPARKIFY_WRITE_MODE", value_enum)]
    pub write_mode: Option<WriteMode>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Dry run - validate configuration and count input files without writing.
    #[arg(long)]
    pub dry_run: bool,
}
