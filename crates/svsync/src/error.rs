//! Error types for the svsync facade.

use svsync_core::CoreError;
use svsync_sync::{FetchError, SyncError};
use thiserror::Error;

/// Errors that can occur during svsync operations.
#[derive(Debug, Error)]
pub enum SvSyncError {
    /// Encoding, naming or signature error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Startup or transport error from the sync layer.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// A fetch ended without data.
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// The store already holds different data under this name.
    #[error("conflicting data already stored under {0}")]
    Conflict(String),
}

/// Result type for svsync operations.
pub type Result<T> = std::result::Result<T, SvSyncError>;
