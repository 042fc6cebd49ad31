//! Snapshot and resume support.
//!
//! A snapshot captures where a machine is (starting token, current token,
//! transition log) so long-lived workflows can survive process restarts.
//! Handler registrations are closures and are **not** captured: restoring
//! means re-running the same configuration code and then re-pointing the
//! machine with [`StateMachine::restore`](crate::StateMachine::restore).

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::history::TransitionLog;
use crate::core::token::StateToken;

pub mod error;

pub use error::SnapshotError;

/// Version identifier for the snapshot format
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable capture of a machine's position.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MachineSnapshot<T: StateToken> {
    /// Snapshot format version
    pub version: u32,

    /// Unique snapshot identifier
    pub id: String,

    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,

    /// The machine's configured starting token
    pub starting: T,

    /// The active token at capture time, `None` for an unstarted machine
    pub current: Option<T>,

    /// Complete transition log at capture time
    pub log: TransitionLog<T>,
}

impl<T: StateToken> MachineSnapshot<T> {
    pub(crate) fn capture(starting: T, current: Option<T>, log: TransitionLog<T>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            id: Uuid::new_v4().to_string(),
            taken_at: Utc::now(),
            starting,
            current,
            log,
        }
    }

    pub(crate) fn check_version(&self) -> Result<(), SnapshotError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: self.version,
                supported: SNAPSHOT_VERSION,
            });
        }
        Ok(())
    }
}

impl<T: StateToken + Serialize + DeserializeOwned> MachineSnapshot<T> {
    /// Encode to JSON.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string(self).map_err(|e| SnapshotError::Serialization(e.to_string()))
    }

    /// Decode from JSON, validating the format version.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| SnapshotError::Deserialization(e.to_string()))?;
        snapshot.check_version()?;
        Ok(snapshot)
    }

    /// Encode to a compact binary format.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        bincode::serialize(self).map_err(|e| SnapshotError::Serialization(e.to_string()))
    }

    /// Decode from the binary format, validating the format version.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Self = bincode::deserialize(bytes)
            .map_err(|e| SnapshotError::Deserialization(e.to_string()))?;
        snapshot.check_version()?;
        Ok(snapshot)
    }
}
