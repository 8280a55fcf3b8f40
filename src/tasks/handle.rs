//! # Caller-facing result handle.
//!
//! [`TaskHandle`] is returned synchronously by
//! [`Limiter::submit`](crate::Limiter::submit) and resolves once the task has
//! actually run to completion:
//!
//! ```text
//! submit() ──► TaskHandle (pending)
//!                 │
//!                 ├─ work Ok(v)   ──► Ok(v)
//!                 ├─ work Err(e)  ──► Err(TaskError::Failed(e))
//!                 ├─ work panics  ──► Err(TaskError::Panicked { .. })
//!                 └─ task dropped ──► Err(TaskError::Lost)
//! ```
//!
//! Dropping a handle does **not** cancel the task: it still runs, still holds
//! its slot while running, and its outcome is discarded.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::TaskError;
use crate::tasks::task::{TaskId, TaskMeta};

/// Sending half wired into the task's future.
pub(crate) type Settle<T, E> = oneshot::Sender<Result<T, TaskError<E>>>;

/// Pending outcome of a submitted task.
#[must_use = "dropping a handle discards the task's outcome (the task still runs)"]
pub struct TaskHandle<T, E> {
    meta: TaskMeta,
    rx: oneshot::Receiver<Result<T, TaskError<E>>>,
}

impl<T, E> TaskHandle<T, E> {
    /// Creates a handle together with the sender that settles it.
    pub(crate) fn pair(meta: TaskMeta) -> (Settle<T, E>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { meta, rx })
    }

    /// Submission id of the task.
    pub fn id(&self) -> TaskId {
        self.meta.id
    }

    /// Name given at submission, if any.
    pub fn name(&self) -> Option<&str> {
        self.meta.name.as_deref()
    }
}

impl<T, E> Future for TaskHandle<T, E> {
    type Output = Result<T, TaskError<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.rx)
            .poll(cx)
            .map(|res| res.unwrap_or(Err(TaskError::Lost)))
    }
}

impl<T, E> std::fmt::Debug for TaskHandle<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.meta.id)
            .field("name", &self.meta.name)
            .finish()
    }
}
