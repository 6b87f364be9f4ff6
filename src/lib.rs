//! sparkify: A batch ETL that turns song metadata and user activity logs
//! into a Parquet star schema.
//!
//! Raw newline-delimited JSON is read from an input root (S3, GCS, Azure or
//! the local filesystem), shaped into the `songs`, `artists`, `users`, `time`
//! and `songplays` tables, and written as partitioned Parquet directories
//! below an output root.
//!
//! # Example
//!
//! ```ignore
//! use sparkify::{Config, run_pipeline, error::PipelineError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), PipelineError> {
//!     let config = Config::from_file("config.yaml")?;
//!     let stats = run_pipeline(config).await?;
//!     println!("Read {} log files", stats.log_files);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod schema;
pub mod session;
pub mod sink;
pub mod source;
pub mod storage;
pub mod table;
pub mod transform;

// Re-export main types
pub use config::Config;
pub use pipeline::{DiscoveryReport, Pipeline, PipelineStats, dry_run, run_pipeline};
pub use storage::{StorageProvider, StorageProviderRef};
pub use table::Table;
