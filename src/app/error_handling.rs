//! Error handling utilities
//!
//! This module provides centralized error handling for the binary.

use crate::error::MapReduceError;
use tracing::error;

/// Exit code for errors that are not a [`MapReduceError`]
const GENERAL_ERROR: i32 = 1;

/// Pick the process exit code for a fatal error
pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<MapReduceError>()
        .map(MapReduceError::exit_code)
        .unwrap_or(GENERAL_ERROR)
}

/// Handle fatal errors and exit with appropriate status code
///
/// - `verbose = 0`: the error message only
/// - `verbose >= 1`: the full error chain as well
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    error!("Fatal error: {}", error);

    match error.downcast_ref::<MapReduceError>() {
        Some(err) => eprintln!("Error: {}", err.user_message()),
        None => eprintln!("Error: {error}"),
    }

    if verbose >= 1 {
        eprintln!("\nError chain:");
        for (i, cause) in error.chain().enumerate() {
            eprintln!("  {}: {}", i, cause);
        }
    }

    std::process::exit(exit_code_for(&error))
}
