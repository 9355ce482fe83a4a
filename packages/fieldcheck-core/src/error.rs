//! # Error Handling
//!
//! Error types for the FieldCheck record store.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Lifecycle / Configuration                                         │
//! │  │   ├── NotInitialized        - Global store not installed            │
//! │  │   ├── AlreadyInitialized    - Global store installed twice          │
//! │  │   └── NotConfigured         - Backend has no endpoint/credentials   │
//! │  │                                                                      │
//! │  ├── Caller Input                                                      │
//! │  │   └── InvalidOwner          - Empty or blank owner id               │
//! │  │                                                                      │
//! │  ├── Storage (transient I/O)                                           │
//! │  │   ├── DatabaseError         - Embedded database failure             │
//! │  │   ├── StorageReadError      - Browser storage / file read failure   │
//! │  │   └── StorageWriteError     - Browser storage / file write failure  │
//! │  │                                                                      │
//! │  ├── Network (transient I/O)                                           │
//! │  │   ├── ConnectionFailed      - Request never got a response          │
//! │  │   ├── Timeout               - Request timed out                     │
//! │  │   └── RemoteRejected        - Service answered with an error status │
//! │  │                                                                      │
//! │  └── Internal                                                          │
//! │      └── SerializationError    - Row could not be (de)serialized       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two outcomes are deliberately *not* errors:
//!
//! - a record owned by somebody else reads as absent (`None`) and mutating it
//!   is a silent no-op, exactly like a missing record;
//! - a remote `create` whose photo follow-up writes fail still returns the new
//!   id. The record is usable, it just lacks those photos.

use thiserror::Error;

/// Result type alias for record store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the record store
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Lifecycle / Configuration Errors (100-199)
    // ========================================================================

    /// The global record store has not been installed
    #[error("Record store has not been initialized. Call RecordStore::initialize() first.")]
    NotInitialized,

    /// The global record store was installed twice
    #[error("Record store has already been initialized.")]
    AlreadyInitialized,

    /// The selected backend has no reachable endpoint or credentials
    #[error("Backend not configured: {0}")]
    NotConfigured(String),

    // ========================================================================
    // Caller Input Errors (200-299)
    // ========================================================================

    /// The owner id was empty or blank
    #[error("Owner id must not be empty.")]
    InvalidOwner,

    // ========================================================================
    // Storage Errors (400-499)
    // ========================================================================

    /// Failed to read from storage
    #[error("Failed to read from storage: {0}")]
    StorageReadError(String),

    /// Failed to write to storage
    #[error("Failed to write to storage: {0}")]
    StorageWriteError(String),

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(String),

    // ========================================================================
    // Network Errors (500-599)
    // ========================================================================

    /// The request never produced a response
    #[error("Failed to reach remote service: {0}")]
    ConnectionFailed(String),

    /// Operation timed out
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// The remote service answered with a non-success status
    #[error("Remote service rejected the request ({status}): {message}")]
    RemoteRejected {
        /// HTTP status code
        status: u16,
        /// Response body or reason phrase
        message: String,
    },

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl Error {
    /// Get the numeric error code for FFI / JS callers
    ///
    /// Error codes are organized by category:
    /// - 100-199: Lifecycle and configuration
    /// - 200-299: Caller input
    /// - 400-499: Storage
    /// - 500-599: Network
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            // Lifecycle (100-199)
            Error::NotInitialized => 100,
            Error::AlreadyInitialized => 101,
            Error::NotConfigured(_) => 102,

            // Input (200-299)
            Error::InvalidOwner => 200,

            // Storage (400-499)
            Error::StorageReadError(_) => 401,
            Error::StorageWriteError(_) => 402,
            Error::DatabaseError(_) => 405,

            // Network (500-599)
            Error::ConnectionFailed(_) => 501,
            Error::Timeout(_) => 502,
            Error::RemoteRejected { .. } => 504,

            // Internal (900-999)
            Error::SerializationError(_) => 902,
        }
    }

    /// Check if this error is a transient I/O failure
    ///
    /// The store never retries on its own; callers use this to decide
    /// whether a "try again" prompt makes sense.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::DatabaseError(_)
            | Error::StorageReadError(_)
            | Error::StorageWriteError(_)
            | Error::ConnectionFailed(_)
            | Error::Timeout(_) => true,
            Error::RemoteRejected { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors can potentially be resolved by retrying
    /// or by fixing configuration.
    pub fn is_recoverable(&self) -> bool {
        self.is_transient() || matches!(self, Error::NotConfigured(_))
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

#[cfg(not(target_arch = "wasm32"))]
impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::StorageReadError(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Error::Timeout(err.to_string());
        }
        if let Some(status) = err.status() {
            return Error::RemoteRejected {
                status: status.as_u16(),
                message: err.to_string(),
            };
        }
        if err.is_decode() {
            return Error::SerializationError(err.to_string());
        }
        Error::ConnectionFailed(err.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::NotInitialized.code(), 100);
        assert_eq!(Error::NotConfigured("remote".into()).code(), 102);
        assert_eq!(Error::InvalidOwner.code(), 200);
        assert_eq!(Error::DatabaseError("locked".into()).code(), 405);
        assert_eq!(
            Error::RemoteRejected {
                status: 401,
                message: "JWT expired".into()
            }
            .code(),
            504
        );
        assert_eq!(Error::SerializationError("eof".into()).code(), 902);
    }

    #[test]
    fn test_transient_errors() {
        assert!(Error::DatabaseError("busy".into()).is_transient());
        assert!(Error::Timeout("10s".into()).is_transient());
        assert!(Error::RemoteRejected {
            status: 503,
            message: "unavailable".into()
        }
        .is_transient());
        assert!(!Error::RemoteRejected {
            status: 403,
            message: "row level security".into()
        }
        .is_transient());
        assert!(!Error::InvalidOwner.is_transient());
    }

    #[test]
    fn test_not_configured_is_recoverable_but_not_transient() {
        let err = Error::NotConfigured("missing key".into());
        assert!(err.is_recoverable());
        assert!(!err.is_transient());
    }
}
