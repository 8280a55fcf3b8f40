//! # Runtime events emitted by the limiter.
//!
//! The [`EventKind`] enum classifies event types across two categories:
//! - **Admission events**: a task was queued or granted a slot, the limiter went idle
//! - **Outcome events**: a task completed, failed, or panicked
//!
//! Subscriber workers additionally report their own overflow and panics.
//!
//! The [`Event`] struct carries metadata such as timestamps, task id/name,
//! failure reasons, and a snapshot of the bookkeeping at the time of the event.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! `TaskQueued` and `TaskAdmitted` are published inside the admission critical
//! section, so their `seq` order is the admission order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use taskgate::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TaskFailed)
//!     .with_task_id(7)
//!     .with_task("fetch")
//!     .with_reason("boom")
//!     .with_elapsed(Duration::from_millis(10));
//!
//! assert_eq!(ev.kind, EventKind::TaskFailed);
//! assert_eq!(ev.task.as_deref(), Some("fetch"));
//! assert_eq!(ev.elapsed_ms, Some(10));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Admission events ===
    /// Task arrived at capacity and was appended to the queue.
    ///
    /// Sets:
    /// - `task_id`, `task` (if named)
    /// - `active`: tasks in flight at the time
    /// - `queued`: queue length after the push
    TaskQueued,

    /// Task was granted a slot (immediately on submit, or popped from the queue).
    ///
    /// Sets:
    /// - `task_id`, `task` (if named)
    /// - `active`: tasks in flight after the increment
    /// - `queued`: queue length after any pop
    TaskAdmitted,

    /// Last task finished and nothing is queued.
    ///
    /// Sets:
    /// - `active`: always 0
    /// - `queued`: always 0
    LimiterIdle,

    // === Outcome events ===
    /// Work function returned `Ok`.
    ///
    /// Sets:
    /// - `task_id`, `task` (if named)
    /// - `elapsed_ms`: time from admission to completion
    TaskCompleted,

    /// Work function returned `Err`.
    ///
    /// Sets:
    /// - `task_id`, `task` (if named)
    /// - `reason`: the error's `Display` rendering
    /// - `elapsed_ms`: time from admission to failure
    TaskFailed,

    /// Work function panicked.
    ///
    /// Sets:
    /// - `task_id`, `task` (if named)
    /// - `reason`: panic payload (if it was a string)
    /// - `elapsed_ms`: time from admission to the panic
    TaskPanicked,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Per-limiter submission id, if applicable.
    pub task_id: Option<u64>,
    /// Task name (or subscriber name for subscriber events).
    pub task: Option<Arc<str>>,
    /// Human-readable reason (errors, panic payloads, overflow details).
    pub reason: Option<Arc<str>>,
    /// Tasks in flight when the event was published.
    pub active: Option<usize>,
    /// Queue length when the event was published.
    pub queued: Option<usize>,
    /// Run time of the task in milliseconds (compact).
    pub elapsed_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task_id: None,
            task: None,
            reason: None,
            active: None,
            queued: None,
            elapsed_ms: None,
        }
    }

    /// Attaches a task id.
    #[inline]
    pub fn with_task_id(mut self, id: u64) -> Self {
        self.task_id = Some(id);
        self
    }

    /// Attaches a task name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a task name if there is one.
    #[inline]
    pub fn with_task_opt(mut self, task: Option<Arc<str>>) -> Self {
        self.task = task;
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a snapshot of the limiter's bookkeeping.
    #[inline]
    pub fn with_load(mut self, active: usize, queued: usize) -> Self {
        self.active = Some(active);
        self.queued = Some(queued);
        self
    }

    /// Attaches a run duration (stored as milliseconds).
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.elapsed_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    /// True for `TaskCompleted`, `TaskFailed` and `TaskPanicked`.
    #[inline]
    pub fn is_outcome(&self) -> bool {
        matches!(
            self.kind,
            EventKind::TaskCompleted | EventKind::TaskFailed | EventKind::TaskPanicked
        )
    }
}
