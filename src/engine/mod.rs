//! The transition engine and its vocabulary.
//!
//! [`Procession`] owns the current step identity and the pending-transition
//! queue, invokes the caller's callback once per transition, enforces the
//! reentrancy ceiling and drives the cooperative execution loop, including
//! timer-delayed transitions.

mod machine;
mod request;
mod transition;

pub use machine::{Callback, Procession, Props, MAX_DEPTH};
pub use transition::{
    ParseLabelError, Transition, BOOT, CANCEL, CONFIRM, END, ERROR, EXIT, START,
};
