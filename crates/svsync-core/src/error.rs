//! Error types for svsync core.

use thiserror::Error;

/// Errors raised while encoding, decoding or verifying core structures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("unexpected TLV type: expected {expected}, got {actual}")]
    UnexpectedType { expected: u64, actual: u64 },

    #[error("truncated TLV: {0}")]
    Truncated(&'static str),

    #[error("invalid non-negative integer width: {0} bytes")]
    InvalidIntegerWidth(usize),

    #[error("trailing bytes after {0}")]
    TrailingBytes(&'static str),

    #[error("malformed entry: {0}")]
    MalformedEntry(String),

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,

    #[error("missing signature")]
    MissingSignature,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("untrusted signer: {0}")]
    UntrustedSigner(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
