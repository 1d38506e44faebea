//! Logging infrastructure.
//!
//! pressdb uses `tracing` for structured logging. All events use target
//! "pressdb" and include an `event` field for filtering.
//!
//! The library never installs a global subscriber; the `pressdb` binary
//! configures `tracing_subscriber`, applications do their own.
//!
//! ## Conventions
//!
//! - `event`: snake_case event name (required)
//! - `component`: subsystem (e.g., "schema", "predicate", "cache")
//! - Use `%` for Display, `?` for Debug formatting

/// Target for all pressdb log events.
pub(crate) const PRESSDB_TARGET: &str = "pressdb";

/// Macro for info-level log events.
///
/// # Example
/// ```ignore
/// log_info!(
///     component = "schema",
///     event = "table_introspected",
///     table = %name,
///     columns = info.len(),
/// );
/// ```
macro_rules! log_info {
    ($($field:tt)*) => {
        ::tracing::info!(target: $crate::observability::PRESSDB_TARGET, $($field)*)
    };
}

/// Macro for debug-level log events.
macro_rules! log_debug {
    ($($field:tt)*) => {
        ::tracing::debug!(target: $crate::observability::PRESSDB_TARGET, $($field)*)
    };
}

/// Macro for warn-level log events.
macro_rules! log_warn {
    ($($field:tt)*) => {
        ::tracing::warn!(target: $crate::observability::PRESSDB_TARGET, $($field)*)
    };
}

pub(crate) use log_debug;
pub(crate) use log_info;
pub(crate) use log_warn;
