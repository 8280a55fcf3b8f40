//! # taskgate
//!
//! **Taskgate** is a small bounded-concurrency task limiter for Rust.
//!
//! Submit asynchronous units of work; at most `limit` of them run at once and
//! the rest wait in a FIFO queue. Whenever a running task finishes (success,
//! error or panic) its slot is handed to the oldest queued task. Each
//! submission returns a [`TaskHandle`] that resolves to that task's own
//! outcome.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   submit(work) ──► TaskHandle ◄─────────────────────────── settle(outcome)
//!        │                                                          ▲
//!        ▼                                                          │
//! ┌──────────────────────────────────────────────────────┐          │
//! │  Limiter                                             │          │
//! │  - AdmissionState (limit, active, FIFO queue)        │          │
//! │  - Bus (broadcast events)                            │          │
//! │  - idle Notify (wait_idle)                           │          │
//! └──────┬───────────────────────────────────┬───────────┘          │
//!        │ active < limit                    │ at capacity          │
//!        ▼                                   ▼                      │
//!   tokio::spawn(Slot + run_once) ◄──── queue.pop_front             │
//!        │                           (on Slot drop)                 │
//!        └──────────────────────────────────────────────────────────┘
//!
//!   Bus ──► subscriber listener ──► SubscriberSet ──► worker per subscriber
//! ```
//!
//! ### Lifecycle
//! ```text
//! submit ──► Queued ──► Admitted ──► Running ──► Completed | Failed | Panicked
//!    └───────────────────► Admitted (slot free at submit time)
//!
//! on exit:
//!   ├─► publish TaskCompleted / TaskFailed / TaskPanicked
//!   ├─► settle the handle (ignored if the handle was dropped)
//!   └─► Slot::drop
//!         ├─ active -= 1
//!         ├─ queue non-empty ─► pop oldest, active += 1, publish TaskAdmitted, spawn
//!         └─ nothing left    ─► publish LimiterIdle, wake wait_idle()
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                  |
//! |-------------------|----------------------------------------------------------|-------------------------------------|
//! | **Limiting**      | Bounded concurrency with FIFO admission.                 | [`Limiter`], [`LimiterStats`]       |
//! | **Results**       | Per-task outcome delivered to the submitter.             | [`TaskHandle`], [`TaskId`]          |
//! | **Subscriber API**| Hook into admission and outcome events.                  | [`Subscribe`], [`Event`]            |
//! | **Errors**        | Typed errors for configuration and task outcomes.        | [`ConfigError`], [`TaskError`]      |
//! | **Configuration** | Limit and event bus sizing.                              | [`LimiterConfig`], [`LimiterBuilder`] |
//!
//! ## Optional features
//! - `logging` (default): exports a built-in [`LogWriter`] that renders events through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use taskgate::{Limiter, LimiterConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn taskgate::Subscribe>> = vec![Arc::new(taskgate::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn taskgate::Subscribe>> = Vec::new();
//!
//!     let limiter = Limiter::builder(LimiterConfig::with_limit(2))
//!         .with_subscribers(subs)
//!         .build()?;
//!
//!     let slow = limiter.submit_named("slow", || async {
//!         tokio::time::sleep(Duration::from_millis(20)).await;
//!         Ok::<_, std::io::Error>("slow")
//!     });
//!     let fast = limiter.submit_named("fast", || async { Ok::<_, std::io::Error>("fast") });
//!
//!     assert_eq!(fast.await?, "fast");
//!     assert_eq!(slow.await?, "slow");
//!     limiter.shutdown().await;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use core::{Limiter, LimiterBuilder, LimiterConfig, LimiterStats};
pub use error::{ConfigError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{TaskHandle, TaskId};

// Optional: built-in subscriber rendering events through `tracing`.
// Enabled by default; disable with `--no-default-features`.
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
