//! # Observing a limiter.
//!
//! A [`Subscribe`] implementation sees the limiter's event stream: which task
//! was queued, when it got a slot, how it ended, and when the limiter drained.
//! Typical uses are structured logs ([`LogWriter`](crate::LogWriter)), queue
//! depth gauges fed from `Event::queued`, or latency histograms fed from
//! `Event::elapsed_ms`.
//!
//! Subscribers never sit on the admission path. The limiter publishes to the
//! bus under its admission lock; a listener task forwards from the bus into a
//! [`SubscriberSet`](crate::SubscriberSet), which queues the event per
//! subscriber and returns immediately. A subscriber that is slow, full or
//! panicking only loses its own events (reported as `SubscriberOverflow` /
//! `SubscriberPanicked`); tasks keep being admitted at full speed.
//!
//! Within one subscriber, events arrive in publish order, so `TaskQueued` and
//! `TaskAdmitted` for a given limiter are seen in admission order.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use async_trait::async_trait;
//! use taskgate::{Event, EventKind, Subscribe};
//!
//! /// Tracks the deepest the queue has been.
//! #[derive(Default)]
//! struct QueueHighWater(AtomicUsize);
//!
//! #[async_trait]
//! impl Subscribe for QueueHighWater {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::TaskQueued {
//!             self.0.fetch_max(ev.queued.unwrap_or(0), Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "queue-high-water" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Receives limiter events on a dedicated worker task.
///
/// `on_event` may await (exporting a metric, writing to a socket); the next
/// event for this subscriber waits until it returns. Keep it short and avoid
/// blocking calls, or raise [`queue_capacity`](Self::queue_capacity) if bursts
/// of submissions are expected.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event.
    async fn on_event(&self, event: &Event);

    /// Label used in overflow and panic reports. Defaults to the type name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Events buffered for this subscriber before new ones are dropped
    /// (minimum 1). Defaults to 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
