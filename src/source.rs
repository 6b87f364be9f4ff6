//! Input discovery and loading.
//!
//! Each dataset is a fixed-depth tree of newline-delimited JSON files below
//! the input root. Files are listed through the [`StorageProvider`] and the
//! resulting engine URLs are handed to the execution context as one table.

use datafusion::arrow::datatypes::SchemaRef;
use datafusion::datasource::file_format::file_compression_type::FileCompressionType;
use datafusion::prelude::{DataFrame, NdJsonReadOptions, SessionContext};
use snafu::prelude::*;
use std::fmt;
use tracing::info;

use crate::config::DatasetConfig;
use crate::emit;
use crate::error::{ListInputSnafu, NoInputFilesSnafu, ReadInputSnafu, SourceError};
use crate::metrics::events::InputFilesDiscovered;
use crate::schema::{log_schema, song_schema};
use crate::storage::{StorageProvider, list_dataset_files};

/// The two raw datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    SongData,
    LogData,
}

impl Dataset {
    pub fn name(&self) -> &'static str {
        match self {
            Dataset::SongData => "song_data",
            Dataset::LogData => "log_data",
        }
    }

    pub fn schema(&self) -> SchemaRef {
        match self {
            Dataset::SongData => song_schema(),
            Dataset::LogData => log_schema(),
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Files of one dataset, as engine URLs.
#[derive(Debug, Clone)]
pub struct InputFiles {
    pub dataset: Dataset,
    pub urls: Vec<String>,
}

impl InputFiles {
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// List the dataset's files. Zero matches is an error.
pub async fn discover(
    storage: &StorageProvider,
    dataset: Dataset,
    layout: &DatasetConfig,
) -> Result<InputFiles, SourceError> {
    let files = list_dataset_files(storage, &layout.prefix, layout.depth, &layout.extension)
        .await
        .context(ListInputSnafu {
            dataset: dataset.name(),
        })?;

    let location = storage.engine_url(&layout.prefix);
    ensure!(
        !files.is_empty(),
        NoInputFilesSnafu {
            dataset: dataset.name(),
            location: location.as_str(),
        }
    );

    info!(
        "Discovered {} {} files under {}",
        files.len(),
        dataset,
        location
    );
    emit!(InputFilesDiscovered {
        dataset: dataset.name(),
        count: files.len(),
    });

    let urls = files
        .iter()
        .map(|path| storage.engine_url(path.as_ref()))
        .collect();

    Ok(InputFiles { dataset, urls })
}

/// Load the listed files into one dataframe with the dataset's schema.
pub async fn read_json(
    ctx: &SessionContext,
    files: InputFiles,
    layout: &DatasetConfig,
) -> Result<DataFrame, SourceError> {
    let schema = files.dataset.schema();
    let options = NdJsonReadOptions::default()
        .schema(&schema)
        .file_extension(&layout.extension)
        .file_compression_type(FileCompressionType::from(layout.compression));

    ctx.read_json(files.urls, options)
        .await
        .context(ReadInputSnafu {
            dataset: files.dataset.name(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    async fn provider(dir: &TempDir) -> StorageProvider {
        StorageProvider::for_url_with_options(dir.path().to_str().unwrap(), &HashMap::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_empty_dataset_is_an_error() {
        let dir = TempDir::new().unwrap();
        let storage = provider(&dir).await;

        let err = discover(&storage, Dataset::LogData, &DatasetConfig::log_data())
            .await
            .unwrap_err();
        match err {
            SourceError::NoInputFiles { dataset, location } => {
                assert_eq!(dataset, "log_data");
                assert!(location.ends_with("log_data"));
            }
            other => panic!("Expected NoInputFiles, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_log_lines_loaded_with_explicit_schema() {
        let dir = TempDir::new().unwrap();
        let storage = provider(&dir).await;
        let lines = concat!(
            r#"{"userId":"7","page":"NextSong","ts":1541106106796,"length":180.5,"extra":true}"#,
            "\n",
            r#"{"userId":"","page":"Home","ts":1541106106800}"#,
            "\n",
        );
        storage
            .put("log_data/2018/11/2018-11-01-events.json", lines.as_bytes().to_vec())
            .await
            .unwrap();

        let layout = DatasetConfig::log_data();
        let files = discover(&storage, Dataset::LogData, &layout).await.unwrap();
        assert_eq!(files.len(), 1);

        let ctx = SessionContext::new();
        let df = read_json(&ctx, files, &layout).await.unwrap();
        assert_eq!(df.schema().fields().len(), log_schema().fields().len());
        assert_eq!(df.count().await.unwrap(), 2);
    }
}
