//! Transition identity and label vocabulary.
//!
//! Every callback invocation corresponds to exactly one [`Transition`].
//! The textual labels (`"BOOT"`, `"start@Request"`, …) remain the wire
//! contract with callbacks; the enum exists so engine internals dispatch
//! over an exhaustive match instead of string comparison.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Label of the synthetic transition emitted once at construction.
pub const BOOT: &str = "BOOT";

/// Label of the synthetic transition emitted once at termination.
pub const EXIT: &str = "EXIT";

/// Annotation kind marking that a step has become current.
pub const START: &str = "start";

/// Annotation kind marking that a step has stopped being current.
pub const END: &str = "end";

/// Built-in annotation kind emitted by [`confirm`](crate::Procession::confirm).
pub const CONFIRM: &str = "confirm";

/// Built-in annotation kind emitted by [`cancel`](crate::Procession::cancel).
pub const CANCEL: &str = "cancel";

/// Built-in annotation kind emitted by [`error`](crate::Procession::error).
pub const ERROR: &str = "error";

/// A single emitted transition.
///
/// Rendered labels follow the fixed vocabulary `"BOOT"`, `"EXIT"`,
/// `"start@{step}"`, `"end@{step}"` and `"{kind}@{step}"` for any
/// caller-chosen annotation kind.
///
/// # Example
///
/// ```rust
/// use procession::Transition;
///
/// let start = Transition::StepStart("Request".to_string());
/// assert_eq!(start.label(), "start@Request");
///
/// let parsed: Transition = "confirm@Request".parse().unwrap();
/// assert_eq!(
///     parsed,
///     Transition::Annotation {
///         kind: "confirm".to_string(),
///         step: "Request".to_string(),
///     }
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    /// The engine was constructed.
    Boot,
    /// The engine terminated; no further transitions follow.
    Exit,
    /// A step became the current step.
    StepStart(String),
    /// A step stopped being the current step.
    StepEnd(String),
    /// A transient state was applied to a step without changing which
    /// step is current.
    Annotation { kind: String, step: String },
}

impl Transition {
    /// Render the textual label passed to callbacks.
    pub fn label(&self) -> String {
        self.to_string()
    }

    /// The step this transition refers to, if any.
    ///
    /// `Boot` and `Exit` are not attached to a step.
    pub fn step(&self) -> Option<&str> {
        match self {
            Self::Boot | Self::Exit => None,
            Self::StepStart(step) | Self::StepEnd(step) => Some(step),
            Self::Annotation { step, .. } => Some(step),
        }
    }

    /// Whether this is one of the two synthetic lifecycle transitions.
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Self::Boot | Self::Exit)
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boot => f.write_str(BOOT),
            Self::Exit => f.write_str(EXIT),
            Self::StepStart(step) => write!(f, "{START}@{step}"),
            Self::StepEnd(step) => write!(f, "{END}@{step}"),
            Self::Annotation { kind, step } => write!(f, "{kind}@{step}"),
        }
    }
}

/// Error returned when a label string does not follow the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("label \"{0}\" is not a recognized transition")]
pub struct ParseLabelError(pub String);

impl FromStr for Transition {
    type Err = ParseLabelError;

    /// Parse a callback label back into its structured form.
    ///
    /// Useful for callbacks that prefer matching on the enum over
    /// comparing label strings.
    fn from_str(label: &str) -> Result<Self, Self::Err> {
        match label {
            BOOT => return Ok(Self::Boot),
            EXIT => return Ok(Self::Exit),
            _ => {}
        }
        match label.split_once('@') {
            Some((kind, step)) if !kind.is_empty() && !step.is_empty() => match kind {
                START => Ok(Self::StepStart(step.to_string())),
                END => Ok(Self::StepEnd(step.to_string())),
                _ => Ok(Self::Annotation {
                    kind: kind.to_string(),
                    step: step.to_string(),
                }),
            },
            _ => Err(ParseLabelError(label.to_string())),
        }
    }
}
