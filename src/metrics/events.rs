//! Internal events for metrics emission.
//!
//! Each event struct represents a measurable occurrence in the pipeline.
//! Events implement the `InternalEvent` trait which records the corresponding
//! Prometheus metric.

use metrics::{counter, gauge, histogram};
use std::time::Duration;
use tracing::trace;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// Event emitted after an input dataset has been listed.
pub struct InputFilesDiscovered {
    pub dataset: &'static str,
    pub count: usize,
}

impl InternalEvent for InputFilesDiscovered {
    fn emit(self) {
        trace!(dataset = self.dataset, count = self.count, "Input files discovered");
        counter!("sparkify_input_files_total", "dataset" => self.dataset)
            .increment(self.count as u64);
    }
}

/// Event emitted when an output table has been written.
pub struct TableWritten {
    pub table: &'static str,
    pub rows: u64,
    pub duration: Duration,
}

impl InternalEvent for TableWritten {
    fn emit(self) {
        trace!(
            table = self.table,
            rows = self.rows,
            duration_ms = self.duration.as_millis(),
            "Table written"
        );
        counter!("sparkify_rows_written_total", "table" => self.table).increment(self.rows);
        histogram!("sparkify_table_write_duration_seconds", "table" => self.table)
            .record(self.duration.as_secs_f64());
    }
}

/// Event emitted when previous output objects are removed before a rewrite.
pub struct OutputCleared {
    pub table: &'static str,
    pub objects: usize,
}

impl InternalEvent for OutputCleared {
    fn emit(self) {
        trace!(table = self.table, objects = self.objects, "Output cleared");
        counter!("sparkify_output_objects_deleted_total", "table" => self.table)
            .increment(self.objects as u64);
    }
}

/// The two transform stages of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SongData,
    LogData,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::SongData => "song_data",
            Stage::LogData => "log_data",
        }
    }
}

/// Event emitted when a transform stage finishes.
pub struct StageCompleted {
    pub stage: Stage,
    pub duration: Duration,
}

impl InternalEvent for StageCompleted {
    fn emit(self) {
        trace!(
            stage = self.stage.as_str(),
            duration_ms = self.duration.as_millis(),
            "Stage completed"
        );
        histogram!("sparkify_stage_duration_seconds", "stage" => self.stage.as_str())
            .record(self.duration.as_secs_f64());
    }
}

/// Event emitted when the execution session is acquired or released.
pub struct ActiveSessions {
    pub count: usize,
}

impl InternalEvent for ActiveSessions {
    fn emit(self) {
        trace!(count = self.count, "Active sessions");
        gauge!("sparkify_active_sessions").set(self.count as f64);
    }
}

// ============================================================================
// Storage operation events
// ============================================================================

/// Storage operation types.
#[derive(Debug, Clone, Copy)]
pub enum StorageOperation {
    List,
    Put,
    Delete,
}

impl StorageOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageOperation::List => "list",
            StorageOperation::Put => "put",
            StorageOperation::Delete => "delete",
        }
    }
}

/// Status of a storage request.
#[derive(Debug, Clone, Copy)]
pub enum RequestStatus {
    Success,
    Error,
}

impl RequestStatus {
    pub fn of<T, E>(result: &Result<T, E>) -> Self {
        if result.is_ok() {
            RequestStatus::Success
        } else {
            RequestStatus::Error
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Success => "success",
            RequestStatus::Error => "error",
        }
    }
}

/// Event emitted when a storage request completes.
pub struct StorageRequest {
    pub operation: StorageOperation,
    pub status: RequestStatus,
}

impl InternalEvent for StorageRequest {
    fn emit(self) {
        trace!(
            operation = self.operation.as_str(),
            status = self.status.as_str(),
            "Storage request"
        );
        counter!(
            "sparkify_storage_requests_total",
            "operation" => self.operation.as_str(),
            "status" => self.status.as_str()
        )
        .increment(1);
    }
}

/// Event emitted when a storage request completes with duration.
pub struct StorageRequestDuration {
    pub operation: StorageOperation,
    pub duration: Duration,
}

impl InternalEvent for StorageRequestDuration {
    fn emit(self) {
        trace!(
            operation = self.operation.as_str(),
            duration_ms = self.duration.as_millis(),
            "Storage request duration"
        );
        histogram!(
            "sparkify_storage_request_duration_seconds",
            "operation" => self.operation.as_str()
        )
        .record(self.duration.as_secs_f64());
    }
}
