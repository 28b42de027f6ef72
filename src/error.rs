//! Structured error types for map-reduce execution
//!
//! Every failure of a stage or pipeline call surfaces as one
//! [`MapReduceError`]. Errors are never retried or suppressed; the partially
//! assembled output of the failing stage is dropped before the error is
//! returned.

use std::fmt;
use thiserror::Error;

/// Result alias used throughout the crate
pub type MapReduceResult<T> = Result<T, MapReduceError>;

/// Output discipline of a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Discipline {
    /// Many output pairs per input, grouped by output key
    Map,
    /// One value list per input key, keyed by the input key
    Reduce,
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discipline::Map => write!(f, "map"),
            Discipline::Reduce => write!(f, "reduce"),
        }
    }
}

/// Main error type for map-reduce operations
#[derive(Debug, Error)]
pub enum MapReduceError {
    /// Malformed input collection, unresolved function or bad config value
    #[error("Invalid argument `{field}`: {reason}")]
    InvalidArgument { field: String, reason: String },

    /// The pool handle does not refer to a live pool
    #[error("Worker pool {pool_id} is not live")]
    InvalidPool { pool_id: String },

    /// A user function failed for a specific key
    #[error("{discipline} function `{function}` failed for key `{key}`: {message}")]
    StageFailed {
        function: String,
        discipline: Discipline,
        key: String,
        message: String,
    },

    /// The worker pool could not be created
    #[error("Failed to provision worker pool with {workers} workers: {reason}")]
    PoolProvisionFailed { workers: usize, reason: String },
}

/// Error codes, grouped by category
///
/// - 1000-1999: argument errors
/// - 2000-2999: pool errors
/// - 4000-4999: execution errors
pub struct ErrorCode;

impl ErrorCode {
    pub const INVALID_ARGUMENT: u16 = 1001;
    pub const INVALID_POOL: u16 = 2001;
    pub const POOL_PROVISION_FAILED: u16 = 2002;
    pub const STAGE_FAILED: u16 = 4001;
}

impl MapReduceError {
    /// Create an argument error for the given field
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Stable numeric code for this error
    pub fn error_code(&self) -> u16 {
        match self {
            Self::InvalidArgument { .. } => ErrorCode::INVALID_ARGUMENT,
            Self::InvalidPool { .. } => ErrorCode::INVALID_POOL,
            Self::PoolProvisionFailed { .. } => ErrorCode::POOL_PROVISION_FAILED,
            Self::StageFailed { .. } => ErrorCode::STAGE_FAILED,
        }
    }

    /// Process exit code to use when this error is fatal
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidArgument { .. } => 2,
            Self::InvalidPool { .. } | Self::PoolProvisionFailed { .. } => 3,
            Self::StageFailed { .. } => 1,
        }
    }

    /// The offending key, for stage failures
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::StageFailed { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Message prefixed with the error code, for terminal output
    pub fn user_message(&self) -> String {
        format!("[E{:04}] {}", self.error_code(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_failed_message_names_function_and_key() {
        let err = MapReduceError::StageFailed {
            function: "split".to_string(),
            discipline: Discipline::Map,
            key: "b".to_string(),
            message: "boom".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("map function `split`"));
        assert!(msg.contains("key `b`"));
        assert!(msg.contains("boom"));
        assert_eq!(err.key(), Some("b"));
    }

    #[test]
    fn test_error_codes_and_exit_codes() {
        let arg = MapReduceError::invalid_argument("data", "duplicate key");
        assert_eq!(arg.error_code(), ErrorCode::INVALID_ARGUMENT);
        assert_eq!(arg.exit_code(), 2);
        assert!(arg.user_message().starts_with("[E1001]"));

        let pool = MapReduceError::InvalidPool {
            pool_id: "p".to_string(),
        };
        assert_eq!(pool.error_code(), ErrorCode::INVALID_POOL);
        assert_eq!(pool.exit_code(), 3);
        assert_eq!(pool.key(), None);
    }
}
