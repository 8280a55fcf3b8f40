//! # Task abstractions.
//!
//! This module provides the task-related types:
//! - [`TaskId`] - per-limiter submission id
//! - [`TaskHandle`] - caller-facing future resolving to the task's outcome
//! - `PendingTask` - queued unit of work (crate-internal)

mod handle;
mod task;

pub use handle::TaskHandle;
pub use task::TaskId;

pub(crate) use task::{PendingTask, TaskMeta};
