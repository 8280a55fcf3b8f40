//! # LogWriter: events rendered through `tracing`
//!
//! A minimal subscriber that turns incoming [`Event`]s into `tracing` records.
//! Install any `tracing` subscriber (e.g. `tracing_subscriber::fmt`) to see them.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! DEBUG taskgate: queued task_id=2 task="C" active=2 queued=1
//!  INFO taskgate: admitted task_id=0 task="A" active=1 queued=0
//!  WARN taskgate: failed task_id=1 task="B" err="boom" elapsed_ms=10
//!  INFO taskgate: completed task_id=0 task="A" elapsed_ms=50
//!  INFO taskgate: idle
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::TaskQueued => {
                tracing::debug!(
                    target: "taskgate",
                    task_id = e.task_id,
                    task,
                    active = e.active,
                    queued = e.queued,
                    "queued"
                );
            }
            EventKind::TaskAdmitted => {
                tracing::info!(
                    target: "taskgate",
                    task_id = e.task_id,
                    task,
                    active = e.active,
                    queued = e.queued,
                    "admitted"
                );
            }
            EventKind::TaskCompleted => {
                tracing::info!(
                    target: "taskgate",
                    task_id = e.task_id,
                    task,
                    elapsed_ms = e.elapsed_ms,
                    "completed"
                );
            }
            EventKind::TaskFailed => {
                tracing::warn!(
                    target: "taskgate",
                    task_id = e.task_id,
                    task,
                    err = e.reason.as_deref(),
                    elapsed_ms = e.elapsed_ms,
                    "failed"
                );
            }
            EventKind::TaskPanicked => {
                tracing::warn!(
                    target: "taskgate",
                    task_id = e.task_id,
                    task,
                    info = e.reason.as_deref(),
                    "panicked"
                );
            }
            EventKind::LimiterIdle => {
                tracing::info!(target: "taskgate", "idle");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(
                    target: "taskgate",
                    subscriber = task,
                    reason = e.reason.as_deref(),
                    "subscriber-overflow"
                );
            }
            EventKind::SubscriberPanicked => {
                tracing::warn!(
                    target: "taskgate",
                    subscriber = task,
                    info = e.reason.as_deref().unwrap_or("unknown"),
                    "subscriber-panicked"
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
