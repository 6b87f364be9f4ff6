//! Metrics and observability infrastructure.
//!
//! - `events`: Internal event types and the `InternalEvent` trait
//! - `server`: Prometheus recorder and HTTP endpoint

pub mod events;
pub mod server;

pub use server::init;

/// Emit an internal event.
///
/// This macro calls the `InternalEvent::emit()` method on the given event,
/// which records the corresponding metric. Without an installed recorder the
/// metric calls are no-ops, so events can be emitted unconditionally.
///
/// # Example
///
/// ```ignore
/// use sparkify::metrics::events::TableWritten;
///
/// emit!(TableWritten { table: "songs", rows: 71, duration });
/// ```
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::metrics::events::InternalEvent::emit($event)
    };
}
