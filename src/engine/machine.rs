//! The transition engine: shared state, the drain loop and the public
//! request surface.

use super::request::{Ready, Request, TransitionQueue};
use super::transition::{Transition, BOOT, CANCEL, CONFIRM, ERROR, EXIT};
use crate::history::{TransitionHistory, TransitionRecord};
use crate::snapshot::Snapshot;
use log::warn;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use uuid::Uuid;

/// The shared mutable property bag handed to every callback invocation.
///
/// An untyped, caller-defined associative value. Merges are shallow and
/// last-write-wins per key; there is no deletion.
pub type Props = Map<String, Value>;

/// Callback invoked exactly once per emitted transition.
///
/// Receives the engine handle (safe to call any public operation
/// reentrantly), the transition label and the current merged property bag.
pub type Callback = dyn Fn(&Procession, &str, &Props) + Send + Sync;

/// Ceiling on synchronous callback nesting before the engine forces
/// termination instead of overflowing the stack.
pub const MAX_DEPTH: usize = 10;

/// State owned by the engine, mutated only inside the drain loop and its
/// direct calls.
struct Shared {
    queue: TransitionQueue,
    props: Props,
    current_step: Option<String>,
    current_label: Option<String>,
    saved_label: Option<String>,
    exited: bool,
    /// A drain loop is actively popping the queue.
    draining: bool,
    /// The next emission is owned by a pending timer task.
    suspended: bool,
    /// Call-stack depth of callback invocations currently on the stack.
    depth: usize,
    history: TransitionHistory,
}

/// A cooperative step/state transition engine.
///
/// The caller defines an implicit state machine by issuing named steps and
/// state annotations; the engine serializes every transition through an
/// internal FIFO queue and invokes a single callback once per transition.
/// Exactly one step is current at a time.
///
/// Construction emits `"BOOT"` synchronously. [`terminate`] emits the end
/// of the current step followed by `"EXIT"`, after which every operation
/// becomes a silent no-op returning `false`.
///
/// Handles are cheap to clone and share; all clones drive the same engine.
/// Delayed transitions run their timer on the ambient tokio runtime when
/// one is present, falling back to a plain timer thread otherwise.
///
/// # Example
///
/// ```rust
/// use procession::Procession;
///
/// let engine = Procession::new(None, |engine, label, _props| match label {
///     "BOOT" => {
///         engine.advance("Request");
///     }
///     "start@Request" => {
///         engine.confirm();
///     }
///     "confirm@Request" => {
///         engine.terminate();
///     }
///     _ => {}
/// });
///
/// assert!(engine.has_exited());
/// assert_eq!(
///     engine.history().labels(),
///     ["BOOT", "start@Request", "confirm@Request", "end@Request", "EXIT"]
/// );
/// ```
///
/// [`terminate`]: Procession::terminate
#[derive(Clone)]
pub struct Procession {
    id: Uuid,
    callback: Arc<Callback>,
    shared: Arc<Mutex<Shared>>,
}

impl Procession {
    /// Create an engine and synchronously emit `"BOOT"`.
    ///
    /// `props` seeds the property bag; `None` starts empty. Requests the
    /// callback issues while handling `"BOOT"` are drained before this
    /// returns, unless one of them carries a delay.
    pub fn new<F>(props: Option<Props>, callback: F) -> Self
    where
        F: Fn(&Procession, &str, &Props) + Send + Sync + 'static,
    {
        let engine = Self {
            id: Uuid::new_v4(),
            callback: Arc::new(callback),
            shared: Arc::new(Mutex::new(Shared {
                queue: TransitionQueue::new(),
                props: props.unwrap_or_default(),
                current_step: Some(BOOT.to_string()),
                current_label: None,
                saved_label: None,
                exited: false,
                draining: false,
                suspended: false,
                depth: 0,
                history: TransitionHistory::new(),
            })),
        };
        engine.emit(&Transition::Boot);
        engine.drain();
        engine
    }

    /// Create an engine with a no-op callback.
    ///
    /// Useful when only the queue discipline, property bag or history are
    /// of interest.
    pub fn silent(props: Option<Props>) -> Self {
        Self::new(props, |_, _, _| {})
    }

    /// Request a step change.
    ///
    /// At drain time this emits `end@{current}` (suppressed when the
    /// current step is `"BOOT"`) followed by `start@{step}`. Requesting
    /// the step that is already current is a silent no-op. Returns `false`
    /// once the engine has exited.
    pub fn advance(&self, step: impl Into<String>) -> bool {
        self.advance_with(step, Props::new(), None)
    }

    /// [`advance`](Self::advance) with a property patch and an optional
    /// timer before `start@{step}` is emitted.
    pub fn advance_with(
        &self,
        step: impl Into<String>,
        props: Props,
        delay: Option<Duration>,
    ) -> bool {
        self.submit(
            props,
            Request {
                target: Some(step.into()),
                kind: None,
                delay,
            },
        )
    }

    /// Terminate the engine.
    ///
    /// Emits `end@{current}` for the current step (unless it is `"BOOT"`),
    /// then `"EXIT"` exactly once, clears the queue and permanently stops
    /// the loop. A timer already pending fires first; its emission and
    /// everything queued behind it stay in order ahead of the termination.
    pub fn terminate(&self) -> bool {
        self.submit(
            Props::new(),
            Request {
                target: None,
                kind: None,
                delay: None,
            },
        )
    }

    /// Apply a state annotation to the current step.
    ///
    /// `state` is any caller-chosen string; the emitted label is
    /// `{state}@{current}`. Annotations never change which step is
    /// current and are never de-duplicated.
    pub fn signal(&self, state: impl Into<String>) -> bool {
        self.signal_with(state, Props::new(), None)
    }

    /// [`signal`](Self::signal) with a property patch and an optional
    /// timer.
    pub fn signal_with(
        &self,
        state: impl Into<String>,
        props: Props,
        delay: Option<Duration>,
    ) -> bool {
        let Some(step) = self.lock().current_step.clone() else {
            return false;
        };
        self.submit(
            props,
            Request {
                target: Some(step),
                kind: Some(state.into()),
                delay,
            },
        )
    }

    /// Apply the `"confirm"` state to the current step.
    pub fn confirm(&self) -> bool {
        self.signal(CONFIRM)
    }

    /// [`confirm`](Self::confirm) with a property patch and an optional
    /// timer.
    pub fn confirm_with(&self, props: Props, delay: Option<Duration>) -> bool {
        self.signal_with(CONFIRM, props, delay)
    }

    /// Apply the `"cancel"` state to the current step.
    pub fn cancel(&self) -> bool {
        self.signal(CANCEL)
    }

    /// [`cancel`](Self::cancel) with a property patch and an optional
    /// timer.
    pub fn cancel_with(&self, props: Props, delay: Option<Duration>) -> bool {
        self.signal_with(CANCEL, props, delay)
    }

    /// Apply the `"error"` state to an explicitly named step.
    ///
    /// The step does not have to be current; the current step is left
    /// untouched either way.
    pub fn error(&self, step: impl Into<String>) -> bool {
        self.error_with(step, Props::new(), None)
    }

    /// [`error`](Self::error) with a property patch and an optional timer.
    pub fn error_with(
        &self,
        step: impl Into<String>,
        props: Props,
        delay: Option<Duration>,
    ) -> bool {
        self.submit(
            props,
            Request {
                target: Some(step.into()),
                kind: Some(ERROR.to_string()),
                delay,
            },
        )
    }

    /// Snapshot the last emitted label for later retrieval with
    /// [`saved_label`](Self::saved_label). Independent of the queue.
    pub fn save_label(&self) {
        let mut shared = self.lock();
        shared.saved_label = shared.current_label.clone();
    }

    /// The label snapshot taken by [`save_label`](Self::save_label).
    pub fn saved_label(&self) -> Option<String> {
        self.lock().saved_label.clone()
    }

    /// Merge a property patch without enqueueing any transition.
    ///
    /// Shallow, last-write-wins per key. Returns `false` once exited.
    pub fn merge_props(&self, props: Props) -> bool {
        let mut shared = self.lock();
        if shared.exited {
            return false;
        }
        shared.props.extend(props);
        true
    }

    /// Log a warning naming the current label.
    ///
    /// Convenience for a callback's fall-through arm; never invoked by the
    /// engine itself.
    pub fn warn_unhandled(&self) {
        let label = self.lock().current_label.clone();
        warn!(
            "procession {}: label \"{}\" was not handled",
            self.id,
            label.as_deref().unwrap_or("*none*")
        );
    }

    /// Unique identity of this engine, also used in log messages.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Name of the current step (`"BOOT"` until the first step change,
    /// `"EXIT"` after termination).
    pub fn current_step(&self) -> Option<String> {
        self.lock().current_step.clone()
    }

    /// Label of the most recently emitted transition.
    pub fn current_label(&self) -> Option<String> {
        self.lock().current_label.clone()
    }

    /// A snapshot of the current merged property bag.
    pub fn props(&self) -> Props {
        self.lock().props.clone()
    }

    /// Whether `"EXIT"` has been emitted. Once true, every request is
    /// rejected.
    pub fn has_exited(&self) -> bool {
        self.lock().exited
    }

    /// Whether a callback invocation is currently on the stack.
    pub fn in_callback(&self) -> bool {
        self.lock().depth > 0
    }

    /// A snapshot of everything emitted so far, in emission order.
    pub fn history(&self) -> TransitionHistory {
        self.lock().history.clone()
    }

    /// A serializable view of the engine state. See [`Snapshot`].
    pub fn snapshot(&self) -> Snapshot {
        let shared = self.lock();
        Snapshot::capture(
            self.id,
            shared.current_step.clone(),
            shared.current_label.clone(),
            shared.saved_label.clone(),
            shared.exited,
            shared.props.clone(),
            shared.history.clone(),
        )
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        // The lock is never held across a callback, so a poisoned guard
        // cannot expose partially updated state.
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Accept a request: merge its property patch, queue it, attempt a
    /// drain. The single entry point for every enqueueing operation.
    fn submit(&self, props: Props, request: Request) -> bool {
        {
            let mut shared = self.lock();
            if shared.exited {
                return false;
            }
            shared.props.extend(props);
            shared.queue.push(request);
        }
        self.drain();
        true
    }

    /// Re-entrant-safe drain entry point.
    ///
    /// A no-op while another drain frame owns the queue or a timer task
    /// owns the next emission; the owning frame will pick up whatever was
    /// just pushed.
    fn drain(&self) {
        {
            let mut shared = self.lock();
            if shared.exited || shared.draining || shared.suspended {
                return;
            }
            shared.draining = true;
        }
        self.run_queue();
    }

    /// The execution loop. Entered with the `draining` flag held; releases
    /// it on the way out.
    fn run_queue(&self) {
        loop {
            loop {
                let next = {
                    let mut guard = self.lock();
                    if guard.exited || guard.suspended {
                        break;
                    }
                    let shared = &mut *guard;
                    match shared.queue.next_ready(&mut shared.current_step) {
                        Some(ready) => ready,
                        None => break,
                    }
                };

                match next {
                    Ready {
                        transition: Transition::Exit,
                        ..
                    } => {
                        self.finish();
                        break;
                    }
                    Ready {
                        transition,
                        delay: Some(delay),
                    } => {
                        self.suspend(transition, delay);
                        break;
                    }
                    Ready {
                        transition,
                        delay: None,
                    } => {
                        if self.lock().depth > MAX_DEPTH {
                            warn!(
                                "procession {}: callback depth exceeded {MAX_DEPTH}, forcing termination",
                                self.id
                            );
                            self.finish();
                            break;
                        }
                        self.emit(&transition);
                    }
                }
            }

            let mut shared = self.lock();
            shared.draining = false;
            // A request may have landed between the last pop and the flag
            // reset; reclaim the flag and keep going rather than strand it.
            if shared.exited || shared.suspended || shared.queue.is_empty() {
                return;
            }
            shared.draining = true;
        }
    }

    /// Invoke the callback for one transition.
    ///
    /// The lock is never held across the invocation, and the `draining`
    /// flag is released for its duration so requests issued from inside
    /// the callback drive a nested drain of the same queue. That nesting
    /// is exactly what [`MAX_DEPTH`] bounds.
    fn emit(&self, transition: &Transition) {
        let label = transition.label();
        let (props, was_draining) = {
            let mut shared = self.lock();
            shared.current_label = Some(label.clone());
            shared.history.push(TransitionRecord::now(transition.clone()));
            shared.depth += 1;
            let was_draining = shared.draining;
            shared.draining = false;
            (shared.props.clone(), was_draining)
        };

        (self.callback)(self, &label, &props);

        let mut shared = self.lock();
        shared.depth -= 1;
        shared.draining = was_draining;
    }

    /// Park the loop on a timer for `transition`.
    ///
    /// Everything queued afterwards waits behind the timer; the resumed
    /// loop emits the parked transition first and then continues in FIFO
    /// order.
    fn suspend(&self, transition: Transition, delay: Duration) {
        {
            let mut shared = self.lock();
            shared.suspended = true;
        }
        let engine = self.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    engine.resume(transition);
                });
            }
            Err(_) => {
                // No ambient runtime; a plain timer thread keeps delayed
                // transitions working in synchronous hosts.
                std::thread::spawn(move || {
                    std::thread::sleep(delay);
                    engine.resume(transition);
                });
            }
        }
    }

    /// Timer expiry: hand the parked transition back to the loop.
    ///
    /// Against an already-exited engine this is a no-op; the queue was
    /// cleared when `"EXIT"` was emitted.
    fn resume(&self, transition: Transition) {
        {
            let mut shared = self.lock();
            shared.suspended = false;
            if shared.exited {
                return;
            }
            shared.queue.push_ready_front(Ready {
                transition,
                delay: None,
            });
            if shared.draining || shared.depth > 0 {
                // An active drain frame, or a callback still on the stack,
                // will pop the entry we just parked at the front; starting
                // a second loop here would run concurrently with it.
                return;
            }
            shared.draining = true;
        }
        self.run_queue();
    }

    /// Idempotent termination: mark exited, clear the queue, emit
    /// `"EXIT"` exactly once.
    fn finish(&self) {
        {
            let mut shared = self.lock();
            if shared.exited {
                return;
            }
            shared.exited = true;
            shared.queue.clear();
            shared.current_step = Some(EXIT.to_string());
        }
        self.emit(&Transition::Exit);
    }
}

impl fmt::Debug for Procession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.lock();
        f.debug_struct("Procession")
            .field("id", &self.id)
            .field("current_step", &shared.current_step)
            .field("current_label", &shared.current_label)
            .field("exited", &shared.exited)
            .field("depth", &shared.depth)
            .finish_non_exhaustive()
    }
}
