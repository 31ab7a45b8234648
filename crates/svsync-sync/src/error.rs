//! Error types for the sync module.

use thiserror::Error;

use svsync_core::{CoreError, NackReason};

/// Errors that can occur during sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The face refused to register the sync prefix. Fatal at startup.
    #[error("failed to register prefix {prefix}: {reason}")]
    RegistrationFailed { prefix: String, reason: String },

    /// Configuration values are unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(String),

    /// Encoding or validation error from core.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

/// Terminal outcome of a fetch that did not yield data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The network rejected the request. Never retried automatically.
    #[error("negative acknowledgement: {0:?}")]
    Nack(NackReason),

    /// No data arrived within the lifetime, after all retries.
    #[error("timed out after {attempts} attempts")]
    Timeout { attempts: u32 },

    /// Data arrived but failed validation, after all validation retries.
    #[error("validation failed: {0}")]
    ValidationFailed(CoreError),

    /// The fetcher was dropped before the request finished.
    #[error("fetcher shut down")]
    Cancelled,
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
