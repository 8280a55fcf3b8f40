use std::sync::Arc;

use super::limiter::Shared;

/// One unit of granted concurrency.
///
/// A `Slot` is created only after the admission state has counted it, and it
/// lives inside the spawned task future. Dropping it returns the unit and runs
/// admission for the head of the queue; this happens on every exit path
/// (success, error, panic, or the runtime dropping the future) and exactly once,
/// since `Slot` is neither `Clone` nor `Copy`.
pub(crate) struct Slot {
    shared: Arc<Shared>,
}

impl Slot {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        Shared::release(&self.shared);
    }
}
