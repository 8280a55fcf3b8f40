//! # Submitted work, as the limiter sees it.
//!
//! A [`PendingTask`] is the unit the admission queue stores: identity metadata
//! plus a boxed future that, when first polled, invokes the caller's work
//! function and settles the caller's handle. Futures are lazy, so nothing the
//! caller supplied runs until the task is admitted and spawned.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

/// Per-limiter submission id.
///
/// Ids increase monotonically in submission order. They label events and
/// handles; scheduling never looks at them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub(crate) u64);

impl TaskId {
    /// Returns the raw id.
    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of a task: id plus optional human-readable name.
#[derive(Debug, Clone)]
pub(crate) struct TaskMeta {
    pub(crate) id: TaskId,
    pub(crate) name: Option<Arc<str>>,
}

impl TaskMeta {
    pub(crate) fn new(id: TaskId, name: Option<Arc<str>>) -> Self {
        Self { id, name }
    }
}

/// A task waiting in (or just popped from) the admission queue.
pub(crate) struct PendingTask {
    pub(crate) meta: TaskMeta,
    run: BoxFuture<'static, ()>,
}

impl PendingTask {
    pub(crate) fn new(meta: TaskMeta, run: BoxFuture<'static, ()>) -> Self {
        Self { meta, run }
    }

    /// Consumes the task, yielding the future to spawn.
    pub(crate) fn into_future(self) -> BoxFuture<'static, ()> {
        self.run
    }
}

impl fmt::Debug for PendingTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTask")
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}
