//! Runtime core: admission, slots and task execution.
//!
//! The only public API from this module is [`Limiter`] (with its builder,
//! config and stats snapshot).
//!
//! Internal modules:
//! - [`state`]: admission bookkeeping (active count + FIFO queue);
//! - [`slot`]: scoped guard returning capacity when an admitted task exits;
//! - [`runner`]: runs one admitted task, catches panics, publishes its outcome;
//! - [`limiter`]: ties the above together behind a cloneable handle;
//! - [`builder`]: validates config and wires optional subscribers.

use std::any::Any;

mod builder;
mod config;
mod limiter;
mod runner;
mod slot;
mod state;

pub use builder::LimiterBuilder;
pub use config::LimiterConfig;
pub use limiter::Limiter;
pub use state::LimiterStats;

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
