//! sparkify-etl: Builds the Sparkify star schema from raw song and log data.
//!
//! Reads song metadata and activity logs from an input root and writes the
//! `songs`, `artists`, `users`, `time` and `songplays` tables as Parquet to
//! an output root. Roots may be S3, GCS, Azure or local paths.

use clap::Parser;
use snafu::prelude::*;
use tracing::{debug, info};

use sparkify::config::{CliArgs, Config};
use sparkify::error::{AddressParseSnafu, ConfigSnafu, MetricsSnafu, PipelineError};
use sparkify::{logging, metrics, pipeline};

#[snafu::report]
#[tokio::main]
async fn main() -> Result<(), PipelineError> {
    let args = CliArgs::parse();

    logging::init(&args.log_level);

    info!("sparkify starting");

    let config = Config::load(&args).context(ConfigSnafu)?;

    if config.metrics.enabled {
        let addr = config.metrics.address.parse().context(AddressParseSnafu)?;
        metrics::init(addr).context(MetricsSnafu)?;
        debug!(
            "Metrics endpoint listening on http://{}/metrics",
            config.metrics.address
        );
    }

    if args.dry_run {
        info!("Dry run mode - validating configuration and listing input");
        info!("Input: {}", config.input.root);
        info!("Output: {}", config.output.root);
        info!("Write mode: {}", config.output.write_mode);
        let report = pipeline::dry_run(&config).await?;
        info!("  song_data files: {}", report.song_files);
        info!("  log_data files: {}", report.log_files);
        info!("Configuration is valid");
        return Ok(());
    }

    let stats = pipeline::run_pipeline(config).await?;

    info!("Pipeline completed successfully");
    info!("  song_data files read: {}", stats.song_files);
    info!("  log_data files read: {}", stats.log_files);
    for (table, rows) in &stats.rows_written {
        info!("  {}: {} rows", table, rows);
    }

    Ok(())
}
