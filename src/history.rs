//! Transition history tracking.
//!
//! The engine records every emitted transition, in emission order, with a
//! timestamp. The history observes exactly the same sequence the callback
//! does, which makes it the natural assertion surface in tests and the
//! audit trail in diagnostics.

use crate::engine::Transition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of a single emitted transition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// What was emitted.
    pub transition: Transition,
    /// When the callback for it was invoked.
    pub timestamp: DateTime<Utc>,
}

impl TransitionRecord {
    /// Record `transition` as emitted now.
    pub fn now(transition: Transition) -> Self {
        Self {
            transition,
            timestamp: Utc::now(),
        }
    }

    /// The textual label the callback received.
    pub fn label(&self) -> String {
        self.transition.label()
    }
}

/// Ordered history of emitted transitions.
///
/// # Example
///
/// ```rust
/// use procession::Procession;
///
/// let engine = Procession::new(None, |engine, label, _| {
///     if label == "BOOT" {
///         engine.advance("Work");
///     }
/// });
///
/// assert_eq!(engine.history().labels(), ["BOOT", "start@Work"]);
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TransitionHistory {
    records: Vec<TransitionRecord>,
}

impl TransitionHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, record: TransitionRecord) {
        self.records.push(record);
    }

    /// All records, in emission order.
    pub fn records(&self) -> &[TransitionRecord] {
        &self.records
    }

    /// The label sequence, in emission order.
    pub fn labels(&self) -> Vec<String> {
        self.records.iter().map(TransitionRecord::label).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Elapsed time between the first and last emission, `None` while
    /// empty.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.records.first()?, self.records.last()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }
}
