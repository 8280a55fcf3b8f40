//! # Admission bookkeeping.
//!
//! [`AdmissionState`] is the only mutable state a limiter has: the in-flight
//! count and the FIFO of tasks waiting for a slot. It is a plain data structure
//! with no locking and no I/O; the [`Limiter`](crate::Limiter) keeps it behind a
//! single mutex so every transition below is one critical section.
//!
//! ## Transitions
//! ```text
//! submit(t):  active < limit ──► active += 1, Run(t)
//!             otherwise      ──► queue.push_back(t), Queued
//!
//! release():  active -= 1
//!             queue non-empty ──► active += 1, Some(queue.pop_front())
//!             otherwise       ──► None
//! ```
//!
//! ## Invariants
//! - `0 <= active <= limit` after every transition.
//! - The queue is non-empty only while `active == limit`.
//! - `release` admits at most one task.

use std::collections::VecDeque;
use std::num::NonZeroUsize;

/// Result of offering a task to the limiter.
#[derive(Debug)]
pub(crate) enum Admission<T> {
    /// A slot was granted; the caller must start the task.
    Run(T),
    /// No capacity; the task was appended to the queue.
    Queued,
}

/// Point-in-time view of a limiter's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterStats {
    /// Concurrency ceiling.
    pub limit: usize,
    /// Tasks currently running.
    pub active: usize,
    /// Tasks waiting for a slot.
    pub queued: usize,
}

impl LimiterStats {
    /// Slots not currently in use.
    #[inline]
    pub fn available(&self) -> usize {
        self.limit - self.active
    }

    /// No task is running or waiting.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.active == 0 && self.queued == 0
    }
}

/// In-flight count plus FIFO of pending tasks.
#[derive(Debug)]
pub(crate) struct AdmissionState<T> {
    limit: usize,
    active: usize,
    queue: VecDeque<T>,
}

impl<T> AdmissionState<T> {
    pub(crate) fn new(limit: NonZeroUsize) -> Self {
        Self {
            limit: limit.get(),
            active: 0,
            queue: VecDeque::new(),
        }
    }

    /// Grants a slot to `task` or queues it behind everything already waiting.
    pub(crate) fn submit(&mut self, task: T) -> Admission<T> {
        if self.active < self.limit {
            self.active += 1;
            Admission::Run(task)
        } else {
            self.queue.push_back(task);
            Admission::Queued
        }
    }

    /// Frees one slot and hands it to the head of the queue, if any.
    ///
    /// Must be called exactly once per task previously returned as `Run`
    /// (from [`submit`](Self::submit)) or `Some` (from `release`).
    pub(crate) fn release(&mut self) -> Option<T> {
        debug_assert!(self.active > 0, "slot released twice");
        self.active = self.active.saturating_sub(1);
        self.next()
    }

    fn next(&mut self) -> Option<T> {
        if self.active >= self.limit {
            return None;
        }
        let task = self.queue.pop_front()?;
        self.active += 1;
        Some(task)
    }

    pub(crate) fn active(&self) -> usize {
        self.active
    }

    pub(crate) fn queued(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.active == 0 && self.queue.is_empty()
    }

    pub(crate) fn stats(&self) -> LimiterStats {
        LimiterStats {
            limit: self.limit,
            active: self.active,
            queued: self.queue.len(),
        }
    }
}
