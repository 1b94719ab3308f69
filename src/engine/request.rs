//! Transition requests and drain-time classification.
//!
//! The queue holds two kinds of entries: raw requests as accepted from the
//! public operations, and ready emissions derived from them. A step-change
//! request expands in place into an `end` annotation for the previous step
//! followed by a `start` annotation for the new one; annotation requests
//! pass through untouched. Expansion pushes the derived entries back onto
//! the front of the same queue, so ordering stays strict FIFO in terms of
//! raw enqueue time.

use super::transition::{Transition, BOOT};
use std::collections::VecDeque;
use std::time::Duration;

/// A raw transition request as accepted from a public operation.
///
/// `target == None` requests termination. `kind == None` marks a
/// step-change request that expands to an end/start pair at drain time;
/// a present `kind` marks a state annotation emitted as-is against the
/// step name captured at enqueue time. `delay == None` means "emit in the
/// same synchronous turn"; `delay == Some(d)` means "emit after a timer
/// of `d`" (zero is a valid timer).
#[derive(Clone, Debug)]
pub(crate) struct Request {
    pub target: Option<String>,
    pub kind: Option<String>,
    pub delay: Option<Duration>,
}

/// A fully classified emission waiting for delivery to the callback.
#[derive(Clone, Debug)]
pub(crate) struct Ready {
    pub transition: Transition,
    pub delay: Option<Duration>,
}

#[derive(Clone, Debug)]
enum QueueEntry {
    Raw(Request),
    Ready(Ready),
}

/// FIFO of pending transitions, mutated only by the engine.
#[derive(Debug, Default)]
pub(crate) struct TransitionQueue {
    entries: VecDeque<QueueEntry>,
}

impl TransitionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, request: Request) {
        self.entries.push_back(QueueEntry::Raw(request));
    }

    /// Park an already-classified emission at the head of the queue.
    ///
    /// Used when a timer expires: the parked transition must come back
    /// out before anything queued while the timer was pending.
    pub fn push_ready_front(&mut self, ready: Ready) {
        self.entries.push_front(QueueEntry::Ready(ready));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pop and classify the next entry, expanding step changes in place.
    ///
    /// `current_step` is updated to the new step name *before* either
    /// derived entry of a step-change becomes visible. A step-change whose
    /// target equals the current step is discarded silently; annotation
    /// requests are never de-duplicated. Returns `None` when the queue has
    /// nothing left to emit.
    pub fn next_ready(&mut self, current_step: &mut Option<String>) -> Option<Ready> {
        loop {
            let request = match self.entries.pop_front()? {
                QueueEntry::Ready(ready) => return Some(ready),
                QueueEntry::Raw(request) => request,
            };

            if let Some(kind) = request.kind {
                // Annotation: emitted as-is, even against a step that is
                // no longer (or never was) current.
                let Some(step) = request.target else { continue };
                return Some(Ready {
                    transition: Transition::Annotation { kind, step },
                    delay: request.delay,
                });
            }

            // Step change. A no-op transition to the current step is
            // dropped without a callback.
            if *current_step == request.target {
                continue;
            }

            let previous = std::mem::replace(current_step, request.target.clone());
            let next = Ready {
                transition: match request.target {
                    Some(name) => Transition::StepStart(name),
                    None => Transition::Exit,
                },
                delay: request.delay,
            };
            self.entries.push_front(QueueEntry::Ready(next));

            // BOOT has no matching end.
            if let Some(name) = previous.filter(|name| name != BOOT) {
                self.entries.push_front(QueueEntry::Ready(Ready {
                    transition: Transition::StepEnd(name),
                    delay: None,
                }));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::transition::EXIT;

    fn step_change(target: &str) -> Request {
        Request {
            target: Some(target.to_string()),
            kind: None,
            delay: None,
        }
    }

    fn annotation(kind: &str, target: &str) -> Request {
        Request {
            target: Some(target.to_string()),
            kind: Some(kind.to_string()),
            delay: None,
        }
    }

    fn drain_labels(queue: &mut TransitionQueue, current: &mut Option<String>) -> Vec<String> {
        let mut labels = Vec::new();
        while let Some(ready) = queue.next_ready(current) {
            labels.push(ready.transition.label());
        }
        labels
    }

    #[test]
    fn first_step_out_of_boot_emits_only_start() {
        let mut queue = TransitionQueue::new();
        let mut current = Some(BOOT.to_string());
        queue.push(step_change("Request"));

        let labels = drain_labels(&mut queue, &mut current);
        assert_eq!(labels, vec!["start@Request"]);
        assert_eq!(current.as_deref(), Some("Request"));
    }

    #[test]
    fn step_change_expands_to_end_then_start() {
        let mut queue = TransitionQueue::new();
        let mut current = Some("Request".to_string());
        queue.push(step_change("Done"));

        let labels = drain_labels(&mut queue, &mut current);
        assert_eq!(labels, vec!["end@Request", "start@Done"]);
    }

    #[test]
    fn self_transition_is_dropped_silently() {
        let mut queue = TransitionQueue::new();
        let mut current = Some("Await".to_string());
        queue.push(step_change("Await"));

        assert!(queue.next_ready(&mut current).is_none());
        assert_eq!(current.as_deref(), Some("Await"));
    }

    #[test]
    fn repeated_annotations_are_not_deduplicated() {
        let mut queue = TransitionQueue::new();
        let mut current = Some("Confirm".to_string());
        queue.push(annotation("confirm", "Confirm"));
        queue.push(annotation("confirm", "Confirm"));

        let labels = drain_labels(&mut queue, &mut current);
        assert_eq!(labels, vec!["confirm@Confirm", "confirm@Confirm"]);
    }

    #[test]
    fn annotation_targets_step_captured_at_enqueue_time() {
        let mut queue = TransitionQueue::new();
        let mut current = Some("Current".to_string());
        queue.push(annotation("error", "Elsewhere"));

        let labels = drain_labels(&mut queue, &mut current);
        assert_eq!(labels, vec!["error@Elsewhere"]);
        assert_eq!(current.as_deref(), Some("Current"));
    }

    #[test]
    fn termination_expands_to_end_then_exit() {
        let mut queue = TransitionQueue::new();
        let mut current = Some("Done".to_string());
        queue.push(Request {
            target: None,
            kind: None,
            delay: None,
        });

        let labels = drain_labels(&mut queue, &mut current);
        assert_eq!(labels, vec!["end@Done", EXIT]);
        assert!(current.is_none());
    }

    #[test]
    fn termination_from_boot_emits_exit_only() {
        let mut queue = TransitionQueue::new();
        let mut current = Some(BOOT.to_string());
        queue.push(Request {
            target: None,
            kind: None,
            delay: None,
        });

        let labels = drain_labels(&mut queue, &mut current);
        assert_eq!(labels, vec![EXIT]);
    }

    #[test]
    fn delay_rides_on_the_start_half_only() {
        let mut queue = TransitionQueue::new();
        let mut current = Some("A".to_string());
        queue.push(Request {
            target: Some("B".to_string()),
            kind: None,
            delay: Some(Duration::from_millis(250)),
        });

        let end = queue.next_ready(&mut current).unwrap();
        assert_eq!(end.transition.label(), "end@A");
        assert!(end.delay.is_none());

        let start = queue.next_ready(&mut current).unwrap();
        assert_eq!(start.transition.label(), "start@B");
        assert_eq!(start.delay, Some(Duration::from_millis(250)));
    }

    #[test]
    fn expansion_keeps_fifo_order_of_raw_requests() {
        let mut queue = TransitionQueue::new();
        let mut current = Some(BOOT.to_string());
        queue.push(step_change("A"));
        queue.push(annotation("confirm", "A"));
        queue.push(step_change("B"));

        let labels = drain_labels(&mut queue, &mut current);
        assert_eq!(labels, vec!["start@A", "confirm@A", "end@A", "start@B"]);
    }
}
