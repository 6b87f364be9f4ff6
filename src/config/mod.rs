//! Configuration parsing and validation.
//!
//! Handles loading configuration from an optional YAML file, applying
//! command-line/environment overrides, and checking the result before any
//! storage is touched.

mod cli;
mod vars;

pub use cli::CliArgs;

use datafusion::datasource::file_format::file_compression_type::FileCompressionType;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{
    ConfigError, EmptyDatasetPrefixSnafu, EmptyInputRootSnafu, EmptyOutputRootSnafu,
    EnvInterpolationSnafu, ReadFileSnafu, ResolvePathSnafu, YamlParseSnafu,
    ZeroListingDepthSnafu, ZeroTargetPartitionsSnafu,
};

/// Main configuration structure for the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    /// Metrics configuration (optional, disabled by default).
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Where the raw song and log records live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Root URL or path shared by both datasets.
    /// Examples: "s3a://udacity-dend/", "/data/sparkify"
    #[serde(default)]
    pub root: String,

    /// Storage options (credentials, region, etc.)
    #[serde(default)]
    pub storage_options: HashMap<String, String>,

    #[serde(default = "DatasetConfig::song_data")]
    pub song_data: DatasetConfig,

    #[serde(default = "DatasetConfig::log_data")]
    pub log_data: DatasetConfig,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            root: String::new(),
            storage_options: HashMap::new(),
            song_data: DatasetConfig::song_data(),
            log_data: DatasetConfig::log_data(),
        }
    }
}

/// Layout of one input dataset below the input root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatasetConfig {
    /// Directory below the input root, joined segment-wise.
    pub prefix: String,

    /// Number of path segments between the prefix and a file, file name included.
    pub depth: usize,

    /// Only objects whose name ends with this suffix are loaded.
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Compression format of input files.
    #[serde(default)]
    pub compression: CompressionFormat,
}

impl DatasetConfig {
    /// `song_data/*/*/*/*`
    pub fn song_data() -> Self {
        Self {
            prefix: "song_data".to_string(),
            depth: 4,
            extension: default_extension(),
            compression: CompressionFormat::None,
        }
    }

    /// `log_data/*/*`
    pub fn log_data() -> Self {
        Self {
            prefix: "log_data".to_string(),
            depth: 2,
            extension: default_extension(),
            compression: CompressionFormat::None,
        }
    }

    fn validate(&self, dataset: &str) -> Result<(), ConfigError> {
        ensure!(
            !self.prefix.trim_matches('/').is_empty(),
            EmptyDatasetPrefixSnafu { dataset }
        );
        ensure!(self.depth > 0, ZeroListingDepthSnafu { dataset });
        Ok(())
    }
}

fn default_extension() -> String {
    ".json".to_string()
}

/// Where the star schema tables are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root URL or path; each table becomes `<root>/<table>.parquet/`.
    #[serde(default)]
    pub root: String,

    /// Storage options (credentials, region, etc.)
    #[serde(default)]
    pub storage_options: HashMap<String, String>,

    /// What to do when a table location already holds data.
    #[serde(default)]
    pub write_mode: WriteMode,

    /// Parquet compression codec.
    #[serde(default)]
    pub compression: ParquetCompression,
}

/// Policy for table locations that already contain objects.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Abort the run.
    #[default]
    Fail,
    /// Delete the existing objects right before writing the table.
    Overwrite,
}

impl std::fmt::Display for WriteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteMode::Fail => write!(f, "fail"),
            WriteMode::Overwrite => write!(f, "overwrite"),
        }
    }
}

/// Compression format for input files.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CompressionFormat {
    #[default]
    None,
    Gzip,
    Bzip2,
    Xz,
    Zstd,
}

impl From<CompressionFormat> for FileCompressionType {
    fn from(format: CompressionFormat) -> Self {
        match format {
            CompressionFormat::None => FileCompressionType::UNCOMPRESSED,
            CompressionFormat::Gzip => FileCompressionType::GZIP,
            CompressionFormat::Bzip2 => FileCompressionType::BZIP2,
            CompressionFormat::Xz => FileCompressionType::XZ,
            CompressionFormat::Zstd => FileCompressionType::ZSTD,
        }
    }
}

/// Parquet compression codec.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParquetCompression {
    Uncompressed,
    #[default]
    Snappy,
    Gzip,
    Zstd,
    Lz4,
}

impl ParquetCompression {
    /// Codec name as understood by the engine's parquet writer options.
    pub fn as_codec(&self) -> &'static str {
        match self {
            ParquetCompression::Uncompressed => "uncompressed",
            ParquetCompression::Snappy => "snappy",
            ParquetCompression::Gzip => "gzip(6)",
            ParquetCompression::Zstd => "zstd(3)",
            ParquetCompression::Lz4 => "lz4",
        }
    }
}

/// Execution engine tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Hash partitions used for every repartition (default: CPU count).
    #[serde(default = "default_target_partitions")]
    pub target_partitions: usize,

    /// Rows per record batch (default: 8192).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_partitions: default_target_partitions(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_target_partitions() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn default_batch_size() -> usize {
    8192
}

/// Metrics configuration for Prometheus endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Whether the Prometheus endpoint is served (default: false).
    #[serde(default)]
    pub enabled: bool,
    /// Address to bind the metrics HTTP server (default: "0.0.0.0:9090").
    #[serde(default = "default_metrics_address")]
    pub address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: default_metrics_address(),
        }
    }
}

fn default_metrics_address() -> String {
    "0.0.0.0:9090".to_string()
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).context(ReadFileSnafu)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text after interpolating environment variables.
    ///
    /// The result is not validated, since CLI overrides may still fill in the roots.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let result = vars::interpolate(content);
        if !result.is_ok() {
            let message = result.errors.join("\n");
            return EnvInterpolationSnafu { message }.fail();
        }
        serde_yaml::from_str(&result.text).context(YamlParseSnafu)
    }

    /// Build the effective configuration: file (if any), then CLI/env overrides,
    /// then path resolution and validation.
    pub fn load(args: &CliArgs) -> Result<Self, ConfigError> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(args);
        config.resolve_local_paths()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI/env values on top of the file values.
    pub fn apply_overrides(&mut self, args: &CliArgs) {
        if let Some(input) = &args.input {
            self.input.root = input.clone();
        }
        if let Some(output) = &args.output {
            self.output.root = output.clone();
        }
        if let Some(mode) = args.write_mode {
            self.output.write_mode = mode;
        }
    }

    /// Make relative local roots absolute so engine URLs can be built from them.
    pub fn resolve_local_paths(&mut self) -> Result<(), ConfigError> {
        self.input.root = resolve_local_root(&self.input.root)?;
        self.output.root = resolve_local_root(&self.output.root)?;
        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure!(!self.input.root.trim().is_empty(), EmptyInputRootSnafu);
        ensure!(!self.output.root.trim().is_empty(), EmptyOutputRootSnafu);
        self.input.song_data.validate("song_data")?;
        self.input.log_data.validate("log_data")?;
        ensure!(self.engine.target_partitions > 0, ZeroTargetPartitionsSnafu);
        Ok(())
    }
}

/// Roots without a scheme are local paths; anything else is left untouched.
fn resolve_local_root(root: &str) -> Result<String, ConfigError> {
    let trimmed = root.trim();
    if trimmed.is_empty() || trimmed.contains("://") || trimmed.starts_with("file:") {
        return Ok(trimmed.to_string());
    }

    let path = PathBuf::from(trimmed);
    if path.is_absolute() {
        return Ok(trimmed.to_string());
    }

    let absolute = std::path::absolute(&path).context(ResolvePathSnafu { path: trimmed })?;
    Ok(absolute.to_string_lossy().into_owned())
}
