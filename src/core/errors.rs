/*!
 * Error Types
 * Lock error handling with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::time::Duration;
use thiserror::Error;

/// Result type for lock operations
pub type LockResult<T> = Result<T, LockError>;

/// Errors raised by the lock itself
///
/// Failures of the work unit are never converted into this type; they reach
/// the caller of [`run`](crate::AsyncMutex::run) unchanged.
#[serde_as]
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum LockError {
    #[error("Lock timeout {} ms", .0.as_millis())]
    #[diagnostic(
        code(lock::timeout),
        help("The lock stayed held for the whole wait window. Shorten the critical section or raise the timeout.")
    )]
    Timeout(#[serde_as(as = "DurationMilliSeconds<u64>")] Duration),

    #[error("Invalid lock configuration: {0}")]
    #[diagnostic(
        code(lock::invalid_config),
        help("Check timeout, backoff base and ceiling values.")
    )]
    InvalidConfig(String),
}

impl LockError {
    /// Whether this error is an acquisition timeout
    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message() {
        let err = LockError::Timeout(Duration::from_millis(200));
        assert_eq!(err.to_string(), "Lock timeout 200 ms");
        assert!(err.is_timeout());
    }

    #[test]
    fn test_serialize_timeout_as_millis() {
        let err = LockError::Timeout(Duration::from_millis(3_000));
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, r#"{"error_type":"timeout","details":3000}"#);

        let back: LockError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }
}
