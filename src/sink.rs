//! Table writer for the output root.
//!
//! Each table becomes a directory of Parquet part files at
//! `<output_root>/<table>.parquet/`. Before writing, the directory is checked
//! against the configured [`WriteMode`]; rows are then hash-repartitioned on
//! the table's keys and written by the engine.

use datafusion::arrow::array::{Array, AsArray, RecordBatch};
use datafusion::arrow::datatypes::{DataType, SchemaRef, UInt64Type};
use datafusion::dataframe::DataFrameWriteOptions;
use datafusion::logical_expr::Partitioning;
use datafusion::parquet::arrow::ArrowWriter;
use datafusion::parquet::errors::ParquetError;
use datafusion::prelude::{DataFrame, ParquetReadOptions, SessionContext};
use snafu::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{OutputConfig, ParquetCompression, WriteMode};
use crate::emit;
use crate::error::{
    ClearOutputSnafu, EncodeEmptySnafu, OutputExistsSnafu, ProbeOutputSnafu, PutEmptySnafu,
    ReadTableSnafu, SinkError, WriteTableSnafu,
};
use crate::metrics::events::{OutputCleared, TableWritten};
use crate::storage::StorageProvider;
use crate::table::Table;

/// Writes star schema tables below one output root.
#[derive(Debug, Clone)]
pub struct TableSink {
    storage: Arc<StorageProvider>,
    write_mode: WriteMode,
    compression: ParquetCompression,
    partitions: usize,
}

impl TableSink {
    pub fn new(storage: Arc<StorageProvider>, output: &OutputConfig, partitions: usize) -> Self {
        Self {
            storage,
            write_mode: output.write_mode,
            compression: output.compression,
            partitions: partitions.max(1),
        }
    }

    /// Engine URL of the table directory.
    pub fn location(&self, table: Table) -> String {
        self.storage.engine_dir_url(&table.dir())
    }

    /// Write `df` as `table`, returning the number of rows written.
    ///
    /// Completes only once every part file is durable, so a following
    /// [`TableSink::read`] sees the full table.
    pub async fn write(
        &self,
        ctx: &SessionContext,
        table: Table,
        df: DataFrame,
    ) -> Result<u64, SinkError> {
        let start = Instant::now();
        self.prepare_location(table).await?;

        let location = self.location(table);
        let schema = Arc::clone(df.schema().inner());
        let mut options = ctx.copied_table_options().parquet;
        options.global.compression = Some(self.compression.as_codec().to_string());

        let batches = df
            .repartition(Partitioning::Hash(table.partition_exprs(), self.partitions))
            .context(WriteTableSnafu {
                table: table.name(),
            })?
            .write_parquet(&location, DataFrameWriteOptions::new(), Some(options))
            .await
            .context(WriteTableSnafu {
                table: table.name(),
            })?;

        let rows = rows_written(&batches);
        if rows == 0 {
            self.ensure_part_file(table, schema).await?;
        }
        let duration = start.elapsed();
        info!(
            "Wrote {} rows to {} in {:.2}s",
            rows,
            location,
            duration.as_secs_f64()
        );
        emit!(TableWritten {
            table: table.name(),
            rows,
            duration,
        });

        Ok(rows)
    }

    /// Read a written table back from storage with a fixed schema.
    pub async fn read(
        &self,
        ctx: &SessionContext,
        table: Table,
        schema: SchemaRef,
    ) -> Result<DataFrame, SinkError> {
        let options = ParquetReadOptions::default().schema(&schema);
        ctx.read_parquet(self.location(table), options)
            .await
            .context(ReadTableSnafu {
                table: table.name(),
            })
    }

    /// Give an empty table a single zero-row part file, so the directory
    /// exists, reads back with its schema and counts as existing output.
    async fn ensure_part_file(&self, table: Table, schema: SchemaRef) -> Result<(), SinkError> {
        let dir = table.dir();
        let written = self
            .storage
            .has_objects(&dir)
            .await
            .context(ProbeOutputSnafu {
                table: table.name(),
            })?;
        if written {
            return Ok(());
        }

        let bytes = empty_parquet(schema).context(EncodeEmptySnafu {
            table: table.name(),
        })?;
        self.storage
            .put(format!("{dir}/part-0.parquet"), bytes)
            .await
            .context(PutEmptySnafu {
                table: table.name(),
            })?;
        debug!("Wrote empty part file for {}", table);
        Ok(())
    }

    /// Enforce the write mode on the table directory.
    async fn prepare_location(&self, table: Table) -> Result<(), SinkError> {
        let dir = table.dir();
        let exists = self
            .storage
            .has_objects(&dir)
            .await
            .context(ProbeOutputSnafu {
                table: table.name(),
            })?;

        if !exists {
            return Ok(());
        }

        match self.write_mode {
            WriteMode::Fail => OutputExistsSnafu {
                table: table.name(),
                location: self.location(table),
            }
            .fail(),
            WriteMode::Overwrite => {
                warn!("Overwriting existing output at {}", self.location(table));
                let objects = self
                    .storage
                    .delete_prefix(&dir)
                    .await
                    .context(ClearOutputSnafu {
                        table: table.name(),
                    })?;
                emit!(OutputCleared {
                    table: table.name(),
                    objects,
                });
                Ok(())
            }
        }
    }
}

fn empty_parquet(schema: SchemaRef) -> Result<Vec<u8>, ParquetError> {
    let mut buffer = Vec::new();
    let writer = ArrowWriter::try_new(&mut buffer, schema, None)?;
    writer.close()?;
    Ok(buffer)
}

/// Sum of the `count` column the engine returns from a write.
fn rows_written(batches: &[RecordBatch]) -> u64 {
    batches
        .iter()
        .filter_map(|batch| batch.column_by_name("count"))
        .filter(|column| column.data_type() == &DataType::UInt64)
        .flat_map(|column| column.as_primitive::<UInt64Type>().iter().flatten())
        .sum()
}
