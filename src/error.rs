//! Error types for sparkify using snafu.
//!
//! Each concern has its own enum with context selectors. Selector names are
//! unique across the module, so every variant name is unique as well.

use datafusion::error::DataFusionError;
use snafu::prelude::*;

// ============ Storage Errors ============

/// Errors that can occur during storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StorageError {
    /// Invalid storage URL format.
    #[snafu(display("Invalid storage URL: {url}"))]
    InvalidUrl { url: String },

    /// Object store operation failed.
    #[snafu(display("Storage operation failed: {source}"))]
    ObjectStore { source: object_store::Error },

    /// IO error during storage operations.
    #[snafu(display("IO error: {source}"))]
    Io { source: std::io::Error },

    /// S3 configuration error.
    #[snafu(display("S3 configuration error: {source}"))]
    S3Config { source: object_store::Error },

    /// GCS configuration error.
    #[snafu(display("GCS configuration error: {source}"))]
    GcsConfig { source: object_store::Error },

    /// Azure configuration error.
    #[snafu(display("Azure configuration error: {source}"))]
    AzureConfig { source: object_store::Error },

    /// A local root that should already exist is missing or not a directory.
    #[snafu(display("Local directory {path} does not exist"))]
    MissingLocalRoot { path: String },

    /// The engine-facing URL for a storage root could not be built.
    #[snafu(display("Invalid engine URL {url}: {source}"))]
    EngineUrl {
        url: String,
        source: url::ParseError,
    },
}

impl StorageError {
    /// Check if this error represents a "not found" condition (404, NoSuchKey, etc.)
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::ObjectStore { source } => {
                matches!(source, object_store::Error::NotFound { .. })
            }
            _ => false,
        }
    }
}

// ============ Config Errors ============

/// Errors that can occur during configuration parsing and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Input root is missing or empty.
    #[snafu(display("Input root cannot be empty (set input.root, --input or SPARKIFY_INPUT_ROOT)"))]
    EmptyInputRoot,

    /// Output root is missing or empty.
    #[snafu(display(
        "Output root cannot be empty (set output.root, --output or SPARKIFY_OUTPUT_ROOT)"
    ))]
    EmptyOutputRoot,

    /// A dataset prefix is empty.
    #[snafu(display("Dataset '{dataset}' has an empty prefix"))]
    EmptyDatasetPrefix { dataset: String },

    /// A dataset listing depth is zero.
    #[snafu(display("Dataset '{dataset}' must have a listing depth of at least 1"))]
    ZeroListingDepth { dataset: String },

    /// Engine partition count is zero.
    #[snafu(display("engine.target_partitions must be at least 1"))]
    ZeroTargetPartitions,

    /// Environment variable interpolation failed.
    #[snafu(display("Environment variable interpolation failed:\n{message}"))]
    EnvInterpolation { message: String },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML: {source}"))]
    YamlParse { source: serde_yaml::Error },

    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file: {source}"))]
    ReadFile { source: std::io::Error },

    /// A relative local path could not be made absolute.
    #[snafu(display("Failed to resolve local path {path}: {source}"))]
    ResolvePath {
        path: String,
        source: std::io::Error,
    },
}

// ============ Session Errors ============

/// Errors that can occur while acquiring the execution context.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SessionError {
    /// Failed to connect a storage root.
    #[snafu(display("Failed to connect storage for {role} root: {source}"))]
    Connector {
        role: &'static str,
        source: StorageError,
    },

    /// Failed to register an object store with the engine.
    #[snafu(display("Failed to register object store: {source}"))]
    RegisterStore { source: StorageError },
}

// ============ Source Errors ============

/// Errors that can occur while discovering and loading input records.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SourceError {
    /// No input files matched the dataset layout.
    #[snafu(display("No input files found for {dataset} under {location}"))]
    NoInputFiles { dataset: String, location: String },

    /// Listing the dataset location failed.
    #[snafu(display("Failed to list {dataset} input: {source}"))]
    ListInput {
        dataset: String,
        source: StorageError,
    },

    /// The engine failed to read the input files.
    #[snafu(display("Failed to read {dataset} input: {source}"))]
    ReadInput {
        dataset: String,
        source: DataFusionError,
    },
}

// ============ Transform Errors ============

/// Errors raised while shaping a table (missing columns, bad types).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum TransformError {
    /// The dataframe plan for a table could not be built.
    #[snafu(display("Failed to build {table} table: {source}"))]
    Shape {
        table: &'static str,
        source: DataFusionError,
    },
}

// ============ Sink Errors ============

/// Errors that can occur while persisting or re-reading output tables.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SinkError {
    /// The table location already holds data and the write mode forbids replacing it.
    #[snafu(display("Output for {table} already exists at {location} (write_mode is 'fail')"))]
    OutputExists {
        table: &'static str,
        location: String,
    },

    /// Checking the table location failed.
    #[snafu(display("Failed to inspect output location for {table}: {source}"))]
    ProbeOutput {
        table: &'static str,
        source: StorageError,
    },

    /// Removing previous output failed.
    #[snafu(display("Failed to clear previous output for {table}: {source}"))]
    ClearOutput {
        table: &'static str,
        source: StorageError,
    },

    /// The engine failed to write the table.
    #[snafu(display("Failed to write {table} table: {source}"))]
    WriteTable {
        table: &'static str,
        source: DataFusionError,
    },

    /// An empty table could not be encoded as a Parquet file.
    #[snafu(display("Failed to encode empty {table} table: {source}"))]
    EncodeEmpty {
        table: &'static str,
        source: datafusion::parquet::errors::ParquetError,
    },

    /// The part file for an empty table could not be stored.
    #[snafu(display("Failed to store empty {table} table: {source}"))]
    PutEmpty {
        table: &'static str,
        source: StorageError,
    },

    /// The engine failed to read a written table back.
    #[snafu(display("Failed to read back {table} table: {source}"))]
    ReadTable {
        table: &'static str,
        source: DataFusionError,
    },
}

// ============ Metrics Errors ============

/// Errors that can occur during metrics initialization.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum MetricsError {
    /// Failed to initialize Prometheus recorder.
    #[snafu(display("Failed to initialize Prometheus recorder: {source}"))]
    PrometheusInit {
        source: metrics_exporter_prometheus::BuildError,
    },
}

// ============ Pipeline Error (top-level) ============

/// Top-level pipeline errors that aggregate all error types.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PipelineError {
    /// Configuration error.
    #[snafu(display("Configuration error: {source}"))]
    Config { source: ConfigError },

    /// Execution context error.
    #[snafu(display("Session error: {source}"))]
    Session { source: SessionError },

    /// Input error.
    #[snafu(display("Source error: {source}"))]
    Source { source: SourceError },

    /// Table shaping error.
    #[snafu(display("Transform error: {source}"))]
    Transform { source: TransformError },

    /// Output error.
    #[snafu(display("Sink error: {source}"))]
    Sink { source: SinkError },

    /// Failed to parse metrics address.
    #[snafu(display("Failed to parse metrics address: {source}"))]
    AddressParse { source: std::net::AddrParseError },

    /// Metrics error.
    #[snafu(display("Metrics error: {source}"))]
    Metrics { source: MetricsError },
}

impl From<ConfigError> for PipelineError {
    fn from(source: ConfigError) -> Self {
        PipelineError::Config { source }
    }
}

impl From<SessionError> for PipelineError {
    fn from(source: SessionError) -> Self {
        PipelineError::Session { source }
    }
}

impl From<SourceError> for PipelineError {
    fn from(source: SourceError) -> Self {
        PipelineError::Source { source }
    }
}

impl From<TransformError> for PipelineError {
    fn from(source: TransformError) -> Self {
        PipelineError::Transform { source }
    }
}

impl From<SinkError> for PipelineError {
    fn from(source: SinkError) -> Self {
        PipelineError::Sink { source }
    }
}

impl From<MetricsError> for PipelineError {
    fn from(source: MetricsError) -> Self {
        PipelineError::Metrics { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        let err = StorageError::ObjectStore {
            source: object_store::Error::NotFound {
                path: "missing".to_string(),
                source: "gone".into(),
            },
        };
        assert!(err.is_not_found());

        let err = StorageError::InvalidUrl {
            url: "nope".to_string(),
        };
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_output_exists_message_names_table_and_location() {
        let err = SinkError::OutputExists {
            table: "songs",
            location: "/out/songs.parquet".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("songs"));
        assert!(msg.contains("/out/songs.parquet"));
    }
}
