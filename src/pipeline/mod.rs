//! Batch driver.
//!
//! Connects storage, the execution session, the transforms and the sink into
//! one run: the song catalog stage writes `songs` and `artists`, then the
//! activity log stage writes `users`, `time` and `songplays`, joining against
//! `songs` as re-read from the output root.

use snafu::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::config::Config;
use crate::emit;
use crate::error::{ConnectorSnafu, PipelineError};
use crate::metrics::events::{Stage, StageCompleted};
use crate::schema::songs_table_schema;
use crate::session::EngineSession;
use crate::sink::TableSink;
use crate::source::{self, Dataset};
use crate::storage::{BackendConfig, StorageProvider, StorageProviderRef};
use crate::table::Table;
use crate::transform;

use datafusion::prelude::{DataFrame, SessionContext};

/// Statistics about the pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub song_files: usize,
    pub log_files: usize,
    /// Rows written per table, in write order.
    pub rows_written: Vec<(Table, u64)>,
}

impl PipelineStats {
    /// Rows written to `table`, if it was written.
    pub fn rows(&self, table: Table) -> Option<u64> {
        self.rows_written
            .iter()
            .find(|(t, _)| *t == table)
            .map(|(_, rows)| *rows)
    }
}

/// Input file counts found by a dry run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub song_files: usize,
    pub log_files: usize,
}

/// Main processing pipeline.
pub struct Pipeline {
    config: Config,
    input: StorageProviderRef,
    output: StorageProviderRef,
    sink: TableSink,
}

impl Pipeline {
    /// Connect both storage roots.
    pub async fn new(config: Config) -> Result<Self, PipelineError> {
        let input = Arc::new(
            StorageProvider::for_url_with_options(
                &config.input.root,
                &config.input.storage_options,
            )
            .await
            .context(ConnectorSnafu { role: "input" })?,
        );

        let output = Arc::new(
            StorageProvider::for_output_with_options(
                &config.output.root,
                &config.output.storage_options,
            )
            .await
            .context(ConnectorSnafu { role: "output" })?,
        );

        let sink = TableSink::new(
            Arc::clone(&output),
            &config.output,
            config.engine.target_partitions,
        );

        Ok(Self {
            config,
            input,
            output,
            sink,
        })
    }

    /// Run both stages against one session, releasing it whatever the outcome.
    pub async fn run(self) -> Result<PipelineStats, PipelineError> {
        info!(
            "Starting pipeline: {} -> {} (write_mode={})",
            self.input.root_url(),
            self.output.root_url(),
            self.config.output.write_mode
        );

        let session = EngineSession::acquire(
            &self.config.engine,
            &[self.input.as_ref(), self.output.as_ref()],
        )?;
        let result = self.run_stages(session.context()).await;
        session.close();

        let stats = result?;
        info!("Pipeline completed: {:?}", stats);
        Ok(stats)
    }

    async fn run_stages(&self, ctx: &SessionContext) -> Result<PipelineStats, PipelineError> {
        let mut stats = PipelineStats::default();
        self.process_song_data(ctx, &mut stats).await?;
        self.process_log_data(ctx, &mut stats).await?;
        Ok(stats)
    }

    /// `song_data` -> `songs`, `artists`.
    async fn process_song_data(
        &self,
        ctx: &SessionContext,
        stats: &mut PipelineStats,
    ) -> Result<(), PipelineError> {
        let start = Instant::now();
        let layout = &self.config.input.song_data;

        let files = source::discover(&self.input, Dataset::SongData, layout).await?;
        stats.song_files = files.len();
        let raw = source::read_json(ctx, files, layout).await?;

        let records = transform::distinct_song_records(raw)?;
        let songs = transform::songs_table(records.clone())?;
        self.write(ctx, Table::Songs, songs, stats).await?;

        let artists = transform::artists_table(records)?;
        self.write(ctx, Table::Artists, artists, stats).await?;

        finish_stage(Stage::SongData, start);
        Ok(())
    }

    /// `log_data` -> `users`, `time`, `songplays`.
    async fn process_log_data(
        &self,
        ctx: &SessionContext,
        stats: &mut PipelineStats,
    ) -> Result<(), PipelineError> {
        let start = Instant::now();
        let layout = &self.config.input.log_data;

        let files = source::discover(&self.input, Dataset::LogData, layout).await?;
        stats.log_files = files.len();
        let raw = source::read_json(ctx, files, layout).await?;
        let events = transform::play_events(raw)?;

        let users = transform::users_table(events.clone())?;
        self.write(ctx, Table::Users, users, stats).await?;

        let time = transform::time_table(events.clone())?;
        self.write(ctx, Table::Time, time, stats).await?;

        // The catalog comes from storage, so this needs the songs write above to have completed.
        let songs = self
            .sink
            .read(ctx, Table::Songs, songs_table_schema())
            .await?;
        let songplays = transform::songplays_table(events, songs)?;
        self.write(ctx, Table::Songplays, songplays, stats).await?;

        finish_stage(Stage::LogData, start);
        Ok(())
    }

    async fn write(
        &self,
        ctx: &SessionContext,
        table: Table,
        df: DataFrame,
        stats: &mut PipelineStats,
    ) -> Result<(), PipelineError> {
        let rows = self.sink.write(ctx, table, df).await?;
        stats.rows_written.push((table, rows));
        Ok(())
    }
}

fn finish_stage(stage: Stage, start: Instant) {
    let duration = start.elapsed();
    info!(
        "Stage {} finished in {:.2}s",
        stage.as_str(),
        duration.as_secs_f64()
    );
    emit!(StageCompleted { stage, duration });
}

/// Run the pipeline.
pub async fn run_pipeline(config: Config) -> Result<PipelineStats, PipelineError> {
    Pipeline::new(config).await?.run().await
}

/// Check that both datasets have input without creating a session or touching output.
pub async fn dry_run(config: &Config) -> Result<DiscoveryReport, PipelineError> {
    BackendConfig::parse_url(&config.output.root).context(ConnectorSnafu { role: "output" })?;

    let input =
        StorageProvider::for_url_with_options(&config.input.root, &config.input.storage_options)
            .await
            .context(ConnectorSnafu { role: "input" })?;

    let songs = source::discover(&input, Dataset::SongData, &config.input.song_data).await?;
    let logs = source::discover(&input, Dataset::LogData, &config.input.log_data).await?;

    Ok(DiscoveryReport {
        song_files: songs.len(),
        log_files: logs.len(),
    })
}
