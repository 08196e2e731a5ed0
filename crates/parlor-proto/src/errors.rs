//! Codec error types.

use thiserror::Error;

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, ProtoError>;

/// Errors produced while encoding frames.
///
/// Decoding never returns an error: unknown or corrupt frames normalize to
/// the [`crate::ServerEvent::Malformed`] sentinel instead.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The value has no wire representation.
    #[error("not encodable: {0}")]
    NotEncodable(&'static str),
}
