//! # Limiter: bounded concurrency with FIFO admission.
//!
//! Runs at most `limit` submitted tasks at a time. Everything above the limit
//! waits in arrival order and is admitted as running tasks finish.
//!
//! ## Architecture
//! ```text
//!                 submit(work)
//!                      │
//!                      ▼
//!        ┌──────── Mutex<AdmissionState> ────────┐
//!        │  active < limit ?                     │
//!        │    yes ──► active += 1 ──► Run ───────┼──► tokio::spawn( Slot + run_once )
//!        │    no  ──► queue.push_back ──► Queued │                      │
//!        └───────────────────────────────────────┘                      │
//!                      ▲                                                 │
//!                      │        Slot::drop (success, error or panic)     │
//!                      └──── active -= 1; pop_front? ──► Run ◄───────────┘
//! ```
//!
//! ## Rules
//! - Admission decisions (submit and release) are single critical sections
//!   on one mutex; the lock is never held across an `.await`.
//! - A task's work function is not called until the task is admitted.
//! - Each admitted task owns exactly one [`Slot`]; dropping it is the only
//!   way capacity is returned, and each drop admits at most one queued task.
//! - `TaskQueued` / `TaskAdmitted` events are published under the lock, so
//!   their `seq` order matches admission order.
//! - Admitted tasks are spawned by one drain loop at a time. A slot released
//!   while that loop runs (for example when a closing runtime drops a freshly
//!   spawned task) only hands its successor to the loop, so the stack depth
//!   does not grow with the queue.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use taskgate::Limiter;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let limiter = Limiter::new(2)?;
//!
//!     let handles: Vec<_> = (0..5u64)
//!         .map(|i| {
//!             limiter.submit(move || async move {
//!                 tokio::time::sleep(Duration::from_millis(10)).await;
//!                 Ok::<_, std::io::Error>(i * 10)
//!             })
//!         })
//!         .collect();
//!
//!     let mut results = Vec::new();
//!     for h in handles {
//!         results.push(h.await?);
//!     }
//!     assert_eq!(results, vec![0, 10, 20, 30, 40]);
//!     Ok(())
//! }
//! ```

use std::collections::VecDeque;
use std::fmt::Display;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use tokio::sync::{Notify, broadcast};

use crate::{
    error::ConfigError,
    events::{Bus, Event, EventKind},
    tasks::{PendingTask, TaskHandle, TaskId, TaskMeta},
};

use super::{
    builder::{Listener, LimiterBuilder},
    config::LimiterConfig,
    runner::run_once,
    slot::Slot,
    state::{Admission, AdmissionState, LimiterStats},
};

/// Admitted tasks waiting to be spawned by the active drain loop.
#[derive(Default)]
struct Dispatch {
    draining: bool,
    ready: VecDeque<PendingTask>,
}

/// State shared by every clone of a [`Limiter`] and every running task.
pub(crate) struct Shared {
    state: Mutex<AdmissionState<PendingTask>>,
    dispatch: Mutex<Dispatch>,
    bus: Bus,
    idle: Notify,
    next_id: AtomicU64,
    /// Subscriber fan-out listener, if subscribers were configured.
    listener: Mutex<Option<Listener>>,
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, AdmissionState<PendingTask>> {
        // Nothing panics while the lock is held; recover rather than propagate.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_dispatch(&self) -> MutexGuard<'_, Dispatch> {
        self.dispatch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Offers a freshly submitted task to the admission state.
    fn admit(self: &Arc<Self>, task: PendingTask) {
        let meta = task.meta.clone();
        let granted = {
            let mut state = self.lock_state();
            let admission = state.submit(task);
            let kind = match admission {
                Admission::Run(_) => EventKind::TaskAdmitted,
                Admission::Queued => EventKind::TaskQueued,
            };
            self.bus.publish(
                Event::new(kind)
                    .with_task_id(meta.id.as_u64())
                    .with_task_opt(meta.name)
                    .with_load(state.active(), state.queued()),
            );
            match admission {
                Admission::Run(task) => Some(task),
                Admission::Queued => None,
            }
        };

        if let Some(task) = granted {
            self.dispatch(task);
        }
    }

    /// Returns one slot and admits the head of the queue, if any.
    ///
    /// Called only from [`Slot::drop`].
    pub(crate) fn release(self: &Arc<Self>) {
        let next = {
            let mut state = self.lock_state();
            let next = state.release();
            match &next {
                Some(task) => self.bus.publish(
                    Event::new(EventKind::TaskAdmitted)
                        .with_task_id(task.meta.id.as_u64())
                        .with_task_opt(task.meta.name.clone())
                        .with_load(state.active(), state.queued()),
                ),
                None if state.is_idle() => {
                    self.bus
                        .publish(Event::new(EventKind::LimiterIdle).with_load(0, 0));
                    self.idle.notify_waiters();
                }
                None => {}
            }
            next
        };

        if let Some(task) = next {
            self.dispatch(task);
        }
    }

    /// Spawns `task`, or hands it to the drain loop already running.
    ///
    /// `launch` can drop a slot synchronously (no runtime, or a runtime that
    /// is shutting down), which re-enters `release` and then `dispatch`. The
    /// nested call only enqueues; the outer loop spawns it.
    fn dispatch(self: &Arc<Self>, task: PendingTask) {
        {
            let mut dispatch = self.lock_dispatch();
            if dispatch.draining {
                dispatch.ready.push_back(task);
                return;
            }
            dispatch.draining = true;
        }

        let mut next = Some(task);
        while let Some(task) = next {
            self.launch(task);

            let mut dispatch = self.lock_dispatch();
            next = dispatch.ready.pop_front();
            if next.is_none() {
                dispatch.draining = false;
            }
        }
    }

    /// Spawns an admitted task together with its slot.
    fn launch(self: &Arc<Self>, task: PendingTask) {
        let slot = Slot::new(Arc::clone(self));
        let task_id = task.meta.id;
        let fut = task.into_future();

        match tokio::runtime::Handle::try_current() {
            Ok(rt) => {
                rt.spawn(async move {
                    let _slot = slot;
                    fut.await;
                });
            }
            Err(_) => {
                // Dropping `fut` settles the handle as `Lost`; dropping `slot`
                // hands the capacity to the next queued task.
                tracing::warn!(%task_id, "no tokio runtime to run admitted task; dropping it");
                drop(fut);
                drop(slot);
            }
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let listener = self
            .listener
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        // Lets the listener drain what is still buffered, then stop its workers.
        if let Some(listener) = listener {
            listener.stop();
        }
    }
}

/// Bounded-concurrency task limiter.
///
/// Cheap to clone; clones share the same limit, counters and queue.
///
/// ### Responsibilities
/// - **Admission**: start a task immediately when a slot is free, queue it otherwise
/// - **Release**: on every task exit, free its slot and admit the oldest queued task
/// - **Settlement**: resolve each task's [`TaskHandle`] with its own outcome
/// - **Event publishing**: report queueing, admission and outcomes on the bus
///
/// ### Rules
/// - At most `limit` tasks run at any instant.
/// - Queued tasks are admitted strictly in submission order.
/// - A failing or panicking task affects only its own handle.
/// - No cancellation: once submitted, a task runs to completion even if its
///   handle is dropped.
#[derive(Clone)]
pub struct Limiter {
    shared: Arc<Shared>,
}

impl Limiter {
    /// Creates a limiter allowing `limit` concurrent tasks, with no subscribers.
    ///
    /// Returns [`ConfigError::NonPositiveLimit`] when `limit == 0`.
    ///
    /// # Example
    /// ```
    /// use taskgate::{ConfigError, Limiter};
    ///
    /// assert!(Limiter::new(3).is_ok());
    /// assert_eq!(
    ///     Limiter::new(0).err(),
    ///     Some(ConfigError::NonPositiveLimit { limit: 0 }),
    /// );
    /// ```
    pub fn new(limit: usize) -> Result<Self, ConfigError> {
        Self::builder(LimiterConfig::with_limit(limit)).build()
    }

    /// Creates a builder for a limiter with subscribers or a custom bus size.
    pub fn builder(cfg: LimiterConfig) -> LimiterBuilder {
        LimiterBuilder::new(cfg)
    }

    pub(crate) fn from_parts(
        limit: NonZeroUsize,
        bus: Bus,
        listener: Option<Listener>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(AdmissionState::new(limit)),
                dispatch: Mutex::new(Dispatch::default()),
                bus,
                idle: Notify::new(),
                next_id: AtomicU64::new(0),
                listener: Mutex::new(listener),
            }),
        }
    }

    /// Submits a unit of work and returns a handle to its eventual outcome.
    ///
    /// Returns immediately. The work function is called once a slot is
    /// available: right away if fewer than `limit` tasks are running,
    /// otherwise after every task queued before it has been admitted.
    ///
    /// Arguments are passed by capturing them in the closure; see
    /// [`submit_with`](Self::submit_with) for an explicit argument form.
    ///
    /// Must be called from within a tokio runtime for the task to run. Outside
    /// one, admitted tasks are dropped and their handles resolve to
    /// [`TaskError::Lost`](crate::TaskError::Lost).
    pub fn submit<F, Fut, T, E>(&self, work: F) -> TaskHandle<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        self.submit_inner(None, work)
    }

    /// Like [`submit`](Self::submit), labelling the task for events and logs.
    pub fn submit_named<F, Fut, T, E>(
        &self,
        name: impl Into<Arc<str>>,
        work: F,
    ) -> TaskHandle<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        self.submit_inner(Some(name.into()), work)
    }

    /// Submits `work` to be called with `args` once admitted.
    ///
    /// # Example
    /// ```
    /// use taskgate::Limiter;
    ///
    /// async fn add((a, b): (u32, u32)) -> Result<u32, std::convert::Infallible> {
    ///     Ok(a + b)
    /// }
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let limiter = Limiter::new(1).unwrap();
    /// assert_eq!(limiter.submit_with(add, (2, 3)).await.unwrap(), 5);
    /// # }
    /// ```
    pub fn submit_with<F, A, Fut, T, E>(&self, work: F, args: A) -> TaskHandle<T, E>
    where
        F: FnOnce(A) -> Fut + Send + 'static,
        A: Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        self.submit_inner(None, move || work(args))
    }

    fn submit_inner<F, Fut, T, E>(&self, name: Option<Arc<str>>, work: F) -> TaskHandle<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        let id = TaskId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let meta = TaskMeta::new(id, name);
        let (settle, handle) = TaskHandle::pair(meta.clone());

        let bus = self.shared.bus.clone();
        let run_meta = meta.clone();
        let run = async move {
            let outcome = run_once(&run_meta, work, &bus).await;
            // Receiver gone means the caller dropped the handle.
            let _ = settle.send(outcome);
        }
        .boxed();

        self.shared.admit(PendingTask::new(meta, run));
        handle
    }

    /// Concurrency ceiling.
    pub fn limit(&self) -> usize {
        self.stats().limit
    }

    /// Tasks currently running.
    pub fn active(&self) -> usize {
        self.shared.lock_state().active()
    }

    /// Tasks waiting for a slot.
    pub fn queued(&self) -> usize {
        self.shared.lock_state().queued()
    }

    /// Consistent snapshot of limit, active and queued counts.
    pub fn stats(&self) -> LimiterStats {
        self.shared.lock_state().stats()
    }

    /// Waits until no task is running and none is queued.
    ///
    /// Returns immediately if the limiter is already idle.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let idle = self.shared.lock_state().is_idle();
            if idle {
                return;
            }
            notified.await;
        }
    }

    /// Waits for idle, then flushes and stops the subscriber workers.
    ///
    /// Every event published up to this point is delivered to the configured
    /// subscribers before this returns. The limiter stays usable afterwards,
    /// but later events only reach receivers from [`subscribe`](Self::subscribe).
    /// Without subscribers this is the same as [`wait_idle`](Self::wait_idle).
    pub async fn shutdown(&self) {
        self.wait_idle().await;

        let listener = self
            .shared
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(listener) = listener {
            listener.stop_and_wait().await;
        }
    }

    /// Creates a receiver for this limiter's events.
    ///
    /// Only events published after this call are observed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.shared.bus.subscribe()
    }
}

impl TryFrom<i64> for Limiter {
    type Error = ConfigError;

    /// Builds a limiter from a signed limit, rejecting zero and negatives.
    ///
    /// # Example
    /// ```
    /// use taskgate::{ConfigError, Limiter};
    ///
    /// assert_eq!(
    ///     Limiter::try_from(-1i64).err(),
    ///     Some(ConfigError::NonPositiveLimit { limit: -1 }),
    /// );
    /// ```
    fn try_from(limit: i64) -> Result<Self, Self::Error> {
        LimiterConfig::try_from(limit).and_then(|cfg| Limiter::builder(cfg).build())
    }
}

impl std::fmt::Debug for Limiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("Limiter")
            .field("limit", &stats.limit)
            .field("active", &stats.active)
            .field("queued", &stats.queued)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn rejects_zero_limit() {
        assert_eq!(
            Limiter::new(0).unwrap_err(),
            ConfigError::NonPositiveLimit { limit: 0 }
        );
        assert_eq!(
            Limiter::try_from(-1i64).unwrap_err(),
            ConfigError::NonPositiveLimit { limit: -1 }
        );
    }

    #[tokio::test]
    async fn immediate_admission_counts_before_work_runs() {
        let limiter = Limiter::new(2).unwrap();
        let (tx, rx) = oneshot::channel::<()>();

        let h = limiter.submit(move || async move {
            let _ = rx.await;
            Ok::<_, String>(())
        });
        // counted synchronously, before the spawned task is polled
        assert_eq!(limiter.active(), 1);
        assert_eq!(limiter.queued(), 0);

        tx.send(()).unwrap();
        h.await.unwrap();
        limiter.wait_idle().await;
        assert_eq!(limiter.active(), 0);
    }

    #[tokio::test]
    async fn queued_work_is_not_called_until_admitted() {
        let limiter = Limiter::new(1).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = oneshot::channel::<()>();

        let first = limiter.submit(move || async move {
            let _ = rx.await;
            Ok::<_, String>(1)
        });
        let second = {
            let calls = calls.clone();
            limiter.submit(move || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, String>(2) }
            })
        };

        tokio::task::yield_now().await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            limiter.stats(),
            LimiterStats {
                limit: 1,
                active: 1,
                queued: 1
            }
        );

        tx.send(()).unwrap();
        assert_eq!(first.await.unwrap(), 1);
        assert_eq!(second.await.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_and_panic_release_their_slots() {
        let limiter = Limiter::new(1).unwrap();

        let failed = limiter.submit(|| async { Err::<(), _>("boom".to_string()) });
        let panicked = limiter.submit(|| async {
            if true {
                panic!("kaboom");
            }
            Ok::<(), String>(())
        });
        let ok = limiter.submit(|| async { Ok::<_, String>("fine") });

        assert_eq!(
            failed.await.unwrap_err().into_failure().as_deref(),
            Some("boom")
        );
        assert!(matches!(
            panicked.await,
            Err(TaskError::Panicked { reason }) if reason == "kaboom"
        ));
        assert_eq!(ok.await.unwrap(), "fine");

        limiter.wait_idle().await;
        assert!(limiter.stats().is_idle());
    }

    #[tokio::test]
    async fn dropped_handle_does_not_cancel() {
        let limiter = Limiter::new(1).unwrap();
        let done = Arc::new(AtomicUsize::new(0));

        {
            let done = done.clone();
            let _ = limiter.submit(move || async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                done.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(())
            });
        }

        limiter.wait_idle().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ids_and_names_label_handles() {
        let limiter = Limiter::new(4).unwrap();
        let a = limiter.submit_named("alpha", || async { Ok::<_, String>(()) });
        let b = limiter.submit(|| async { Ok::<_, String>(()) });

        assert_eq!(a.name(), Some("alpha"));
        assert_eq!(b.name(), None);
        assert!(b.id() > a.id());

        a.await.unwrap();
        b.await.unwrap();
    }

    #[tokio::test]
    async fn wait_idle_returns_immediately_when_idle() {
        let limiter = Limiter::new(1).unwrap();
        limiter.wait_idle().await;
    }

    #[test]
    fn submit_outside_runtime_resolves_lost() {
        let limiter = Limiter::new(1).unwrap();
        let first = limiter.submit(|| async { Ok::<_, String>(1) });
        let second = limiter.submit(|| async { Ok::<_, String>(2) });

        assert!(limiter.stats().is_idle());

        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        assert!(matches!(rt.block_on(first), Err(TaskError::Lost)));
        assert!(matches!(rt.block_on(second), Err(TaskError::Lost)));
    }

    #[test]
    fn runtime_shutdown_with_long_queue_settles_every_handle() {
        const TASKS: usize = 20_000;

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let limiter = Limiter::new(1).unwrap();
        let handles: Vec<_> = rt.block_on(async {
            let handles: Vec<_> = (0..TASKS)
                .map(|_| {
                    limiter.submit(|| async {
                        tokio::time::sleep(Duration::from_secs(3600)).await;
                        Ok::<_, String>(())
                    })
                })
                .collect();
            tokio::task::yield_now().await;
            handles
        });
        assert_eq!(
            limiter.stats(),
            LimiterStats {
                limit: 1,
                active: 1,
                queued: TASKS - 1
            }
        );

        // Dropping the running task cascades through the whole queue.
        drop(rt);
        assert!(limiter.stats().is_idle());

        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let lost = rt
            .block_on(futures::future::join_all(handles))
            .into_iter()
            .filter(|res| matches!(res, Err(TaskError::Lost)))
            .count();
        assert_eq!(lost, TASKS);
    }

    #[tokio::test]
    async fn drain_loop_is_idle_after_a_burst() {
        let limiter = Limiter::new(2).unwrap();
        let handles: Vec<_> = (0..64u32)
            .map(|i| limiter.submit(move || async move { Ok::<_, String>(i) }))
            .collect();

        for (i, h) in handles.into_iter().enumerate() {
            assert_eq!(h.await.unwrap(), i as u32);
        }
        limiter.wait_idle().await;

        let dispatch = limiter.shared.lock_dispatch();
        assert!(!dispatch.draining);
        assert!(dispatch.ready.is_empty());
    }
}
