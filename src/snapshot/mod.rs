//! Serializable snapshots of engine state.
//!
//! A snapshot is a one-way export for inspection, persistence of audit
//! trails, or crash reports. An engine is never reconstructed from a
//! snapshot: the `"BOOT"` handshake is bound to construction, and the
//! callback is not serializable.

use crate::engine::Props;
use crate::history::TransitionHistory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod error;

pub use error::SnapshotError;

/// Version identifier for the snapshot format
pub const SNAPSHOT_VERSION: u32 = 1;

/// A point-in-time, serializable view of an engine.
///
/// # Example
///
/// ```rust
/// use procession::{Procession, Snapshot};
///
/// let engine = Procession::new(None, |engine, label, _| {
///     if label == "BOOT" {
///         engine.advance("Request");
///     }
/// });
///
/// let snapshot = engine.snapshot();
/// assert_eq!(snapshot.current_step.as_deref(), Some("Request"));
///
/// let json = snapshot.to_json().unwrap();
/// let back = Snapshot::from_json(&json).unwrap();
/// assert_eq!(back.current_label.as_deref(), Some("start@Request"));
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    /// Snapshot format version
    pub version: u32,

    /// Identity of the engine this was captured from
    pub engine_id: Uuid,

    /// When the snapshot was captured
    pub timestamp: DateTime<Utc>,

    /// Name of the current step
    pub current_step: Option<String>,

    /// Label of the most recently emitted transition
    pub current_label: Option<String>,

    /// Label saved with `save_label`, if any
    pub saved_label: Option<String>,

    /// Whether the engine has terminated
    pub exited: bool,

    /// The merged property bag
    pub props: Props,

    /// Everything emitted so far
    pub history: TransitionHistory,
}

impl Snapshot {
    pub(crate) fn capture(
        engine_id: Uuid,
        current_step: Option<String>,
        current_label: Option<String>,
        saved_label: Option<String>,
        exited: bool,
        props: Props,
        history: TransitionHistory,
    ) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            engine_id,
            timestamp: Utc::now(),
            current_step,
            current_label,
            saved_label,
            exited,
            props,
            history,
        }
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string(self).map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    /// Deserialize from a JSON string, validating the format version.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json)
            .map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))?;
        snapshot.validate_version()
    }

    fn validate_version(self) -> Result<Self, SnapshotError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: self.version,
                supported: SNAPSHOT_VERSION,
            });
        }
        Ok(self)
    }
}
