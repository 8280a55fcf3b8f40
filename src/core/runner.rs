//! # Run a single admitted task.
//!
//! Invokes the caller's work function, waits for its outcome and publishes the
//! terminal event to the [`Bus`].
//!
//! ## Event flow
//!
//! ```text
//! Success:
//!   work() → Ok(v)   → publish TaskCompleted → Ok(v)
//!
//! Failure:
//!   work() → Err(e)  → publish TaskFailed    → Err(TaskError::Failed(e))
//!
//! Panic:
//!   work() → unwind  → publish TaskPanicked  → Err(TaskError::Panicked)
//! ```
//!
//! ## Rules
//! - Always publishes **exactly one** terminal event.
//! - The error value is forwarded verbatim; only its `Display` is copied into the event.
//! - The work function is called inside `catch_unwind`, so a panic in its
//!   synchronous prologue is caught the same way as one inside the future.
//! - Slot release is not done here; the `Slot` guard owned by the spawned
//!   future handles it after this returns (or unwinds).

use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::time::Instant;

use crate::{
    core::panic_message,
    error::TaskError,
    events::{Bus, Event, EventKind},
    tasks::TaskMeta,
};

/// Executes `work` once, publishing its outcome to `bus`.
pub(crate) async fn run_once<F, Fut, T, E>(
    meta: &TaskMeta,
    work: F,
    bus: &Bus,
) -> Result<T, TaskError<E>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let started = Instant::now();
    let res = AssertUnwindSafe(async move { work().await })
        .catch_unwind()
        .await;
    let elapsed = started.elapsed();

    let event = |kind| {
        Event::new(kind)
            .with_task_id(meta.id.as_u64())
            .with_task_opt(meta.name.clone())
            .with_elapsed(elapsed)
    };

    match res {
        Ok(Ok(value)) => {
            bus.publish(event(EventKind::TaskCompleted));
            Ok(value)
        }
        Ok(Err(e)) => {
            bus.publish(event(EventKind::TaskFailed).with_reason(e.to_string()));
            Err(TaskError::Failed(e))
        }
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            bus.publish(event(EventKind::TaskPanicked).with_reason(reason.as_str()));
            Err(TaskError::Panicked { reason })
        }
    }
}
