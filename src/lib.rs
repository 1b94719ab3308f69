//! Procession: a cooperative step/state transition engine
//!
//! A caller defines an implicit state machine by issuing named **steps**
//! (phases of a process) and **states** (transient annotations on a step,
//! such as confirm/cancel/error). The engine invokes a single callback
//! synchronously for every transition and serializes all transitions
//! through an internal FIFO queue, even when some of them are delayed by a
//! timer.
//!
//! # Core Concepts
//!
//! - **Step**: a named phase; exactly one is current at a time
//! - **Annotation**: a transient event attached to a step without changing
//!   which step is current
//! - **Label**: the string handed to the callback identifying the exact
//!   transition (`"BOOT"`, `"start@Request"`, `"confirm@Request"`, …)
//! - **Drain**: processing queued requests until the queue is empty or the
//!   loop suspends on a timer
//!
//! # Example
//!
//! ```rust
//! use procession::Procession;
//!
//! let engine = Procession::new(None, |engine, label, _props| match label {
//!     "BOOT" => {
//!         engine.advance("Request");
//!     }
//!     "start@Request" => {
//!         engine.confirm();
//!     }
//!     "confirm@Request" => {
//!         engine.advance("Done");
//!     }
//!     "start@Done" => {
//!         engine.terminate();
//!     }
//!     "end@Request" | "end@Done" | "EXIT" => {}
//!     _ => engine.warn_unhandled(),
//! });
//!
//! assert!(engine.has_exited());
//! assert_eq!(
//!     engine.history().labels(),
//!     [
//!         "BOOT",
//!         "start@Request",
//!         "confirm@Request",
//!         "end@Request",
//!         "start@Done",
//!         "end@Done",
//!         "EXIT",
//!     ]
//! );
//! ```
//!
//! Delayed transitions (`advance_with`, `signal_with`, …) run their timer
//! on the ambient tokio runtime; everything queued behind the timer waits
//! for it, so ordering stays strict FIFO in terms of enqueue time.

pub mod engine;
pub mod history;
pub mod snapshot;

// Re-export commonly used types
pub use engine::{Callback, ParseLabelError, Procession, Props, Transition};
pub use history::{TransitionHistory, TransitionRecord};
pub use snapshot::{Snapshot, SnapshotError};
