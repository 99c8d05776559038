//! Logging utilities for gridclip.
//!
//! This module provides structured logging helpers so that dataset opens and
//! selections leave searchable, consistent records.

use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::grid::Grid;
use crate::select::Selection;

/// Initialize the tracing subscriber with the given log level
pub fn init_tracing(log_level: &str) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(val) => val,
        Err(_) => log_level.to_string(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Log a start message for a significant operation
pub fn log_operation_start(operation: &str, details: Option<&str>) {
    if let Some(details) = details {
        info!(
            operation = operation,
            details = details,
            "Starting operation"
        );
    } else {
        info!(operation = operation, "Starting operation");
    }
}

/// Log the completion of a significant operation
pub fn log_operation_end(operation: &str, start_time: Instant, success: bool) {
    let duration = start_time.elapsed();
    let duration_ms = duration.as_secs_f64() * 1000.0;

    if success {
        info!(
            operation = operation,
            duration_ms = duration_ms,
            "Operation completed successfully"
        );
    } else {
        warn!(
            operation = operation,
            duration_ms = duration_ms,
            "Operation completed with warnings"
        );
    }
}

/// Log an operation with timing and result in a single statement
pub fn log_timed_operation<F, R>(operation: &str, f: F) -> R
where
    F: FnOnce() -> R,
{
    let start = Instant::now();
    let operation_id = Uuid::new_v4();

    debug!(
        operation = operation,
        operation_id = %operation_id,
        "Starting operation"
    );

    let result = f();

    let duration = start.elapsed();

    info!(
        operation = operation,
        operation_id = %operation_id,
        duration_ms = duration.as_secs_f64() * 1000.0,
        "Operation completed"
    );

    result
}

/// Log the shape and convention of a built grid
pub fn log_grid_stats(variable: &str, grid: &Grid) {
    let (rows, cols) = grid.shape();
    let resolution = grid.resolution();
    info!(
        operation = "grid_build",
        variable = variable,
        rows = rows,
        cols = cols,
        abstraction = %grid.abstraction(),
        row_resolution = resolution.row,
        col_resolution = resolution.col,
        wrapped = grid.wrap_state().is_wrapped,
        "Grid built"
    );
}

/// Log how many cells a selection kept
pub fn log_selection_stats(variable: &str, grid: &Grid, selection: &Selection) {
    info!(
        operation = "select",
        variable = variable,
        total_cells = grid.len(),
        selected_cells = selection.len(),
        "Selection finished"
    );
}

/// Log an error with context
pub fn log_error(error: &crate::error::GridclipError, context: &str) {
    error!(
        error = %error,
        context = context,
        error_type = std::any::type_name_of_val(error),
        "Error occurred"
    );
}

/// Generate a unique operation ID
pub fn generate_operation_id() -> String {
    Uuid::new_v4().to_string()
}
