//! Snapshot error types.

use thiserror::Error;

/// Errors that can occur while encoding, decoding, or restoring snapshots.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Serialization to JSON or binary format failed
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Deserialization from JSON or binary format failed
    #[error("Deserialization failed: {0}")]
    Deserialization(String),

    /// Snapshot format version is not supported by this version
    #[error("Unsupported snapshot version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// Snapshot points at a state the target machine never configured
    #[error("Snapshot points at unconfigured state {0}")]
    UnknownState(String),
}
