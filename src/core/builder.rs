use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::core::{Config, SensorStreamManager};
use crate::events::{Bus, Event, EventKind};
use crate::sensor::SensorProvider;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for constructing a [`SensorStreamManager`] with optional subscribers.
///
/// `K` is the identifier type of the manager being built.
pub struct ManagerBuilder<K, P> {
    provider: P,
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    _key: PhantomData<fn() -> K>,
}

impl<K, P> ManagerBuilder<K, P>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    P: SensorProvider,
{
    /// Creates a new builder with default configuration.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            cfg: Config::default(),
            subscribers: Vec::new(),
            _key: PhantomData,
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, cfg: Config) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive manager events (lifecycle, diagnostics, failures)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the manager.
    ///
    /// # Panics
    /// If subscribers were given and this is called outside a tokio runtime
    /// (their workers and the bus listener are spawned here).
    pub fn build(self) -> SensorStreamManager<K, P> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let runtime_token = CancellationToken::new();

        if !self.subscribers.is_empty() {
            let subs = SubscriberSet::new(self.subscribers, bus.clone());
            spawn_listener(&bus, subs, runtime_token.clone());
        }

        SensorStreamManager::from_parts(self.provider, self.cfg, bus, runtime_token)
    }
}

/// Forwards bus events to the subscriber set until the manager is dropped.
fn spawn_listener(bus: &Bus, subs: SubscriberSet, token: CancellationToken) {
    let mut rx = bus.subscribe();
    let bus = bus.clone();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                msg = rx.recv() => match msg {
                    Ok(ev) => subs.emit(&ev),
                    Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(n)) => {
                        bus.publish(
                            Event::new(EventKind::SubscriberOverflow)
                                .with_session("bus_listener")
                                .with_reason(format!("lagged {n}")),
                        );
                    }
                }
            }
        }
        subs.shutdown().await;
    });
}
