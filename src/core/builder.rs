use std::sync::Arc;

use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::{
    error::ConfigError,
    events::{Bus, Event},
    subscribers::{Subscribe, SubscriberSet},
};

use super::{config::LimiterConfig, limiter::Limiter};

/// Builder for constructing a [`Limiter`] with optional subscribers.
pub struct LimiterBuilder {
    cfg: LimiterConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl LimiterBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: LimiterConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive limiter events (queueing, admission, outcomes)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds a single subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Validates the configuration and builds the limiter.
    ///
    /// If any subscribers were added, this spawns their workers plus a bus
    /// listener and therefore must run inside a tokio runtime. The listener
    /// stops on [`Limiter::shutdown`], or once the last clone of the limiter
    /// and the last running task are gone; either way it first forwards every
    /// event still buffered on the bus.
    pub fn build(self) -> Result<Limiter, ConfigError> {
        let limit = self.cfg.concurrency_limit()?;
        let bus = Bus::new(self.cfg.bus_capacity_clamped());

        let listener = if self.subscribers.is_empty() {
            None
        } else {
            Some(spawn_listener(bus.clone(), self.subscribers))
        };

        Ok(Limiter::from_parts(limit, bus, listener))
    }
}

/// Running bus listener plus the signal that stops it.
pub(crate) struct Listener {
    stop: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

impl Listener {
    /// Signals the listener without waiting for it.
    pub(crate) fn stop(self) {
        let _ = self.stop.send(());
    }

    /// Signals the listener and waits until every subscriber worker is done.
    pub(crate) async fn stop_and_wait(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.join.await {
            tracing::warn!(error = %e, "subscriber listener ended abnormally");
        }
    }
}

/// Subscribes to the bus and forwards events to the subscriber set.
fn spawn_listener(bus: Bus, subscribers: Vec<Arc<dyn Subscribe>>) -> Listener {
    // Subscribe before spawning so events published right after `build` are seen.
    let mut rx = bus.subscribe();
    let set = SubscriberSet::new(subscribers, bus);
    let (stop, mut stopped) = oneshot::channel::<()>();

    let join = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                res = rx.recv() => match res {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "subscriber listener lagged; events dropped");
                    }
                    Err(RecvError::Closed) => break,
                },
                // A dropped sender counts as a stop request too.
                _ = &mut stopped => {
                    drain(&mut rx, &set);
                    break;
                }
            }
        }
        set.shutdown().await;
    });

    Listener { stop, join }
}

/// Forwards everything still buffered on the bus without waiting for more.
fn drain(rx: &mut broadcast::Receiver<Event>, set: &SubscriberSet) {
    loop {
        match rx.try_recv() {
            Ok(ev) => set.emit(&ev),
            Err(TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "subscriber listener lagged; events dropped");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}
