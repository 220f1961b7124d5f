//! # SensorStreamManager: handle lifecycle and update streams per identifier.
//!
//! The manager owns a [`SensorProvider`], a handle registry and a
//! subscription registry, both behind one session lock.
//!
//! ## State machine (per identifier)
//! ```text
//!                create                 start_updates
//! Unallocated ─────────► Allocated ────────────────────► Streaming
//!      ▲                  │    ▲                            │
//!      │     destroy      │    │  stop_updates / stream     │
//!      └──────────────────┘    │  dropped / sensor error    │
//!      ▲                       └────────────────────────────┘
//!      │                  destroy (stops the stream first,
//!      └───────────────── unless Config::stop_on_destroy is false)
//! ```
//!
//! ## Misuse (reported via the diagnostic reporter, never returned)
//! - `create` on Allocated/Streaming → `DuplicateCreate`, first handle kept
//! - `start_updates` / `stop_updates` on Unallocated → `HandleNotFound`, no-op
//! - `start_updates` on Streaming → empty stream (`DuplicateStart` event only)
//!
//! ## Locking
//! Every check-then-act sequence runs under the session lock, including
//! `begin_updates` and the `end_updates` of `stop_updates`/`destroy`.
//! Provider callbacks never take the lock, so inline delivery cannot deadlock.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;

use crate::core::{
    Altimeter, Config, DiagnosticReporter, ManagerBuilder, handles::HandleRegistry, lock,
    subscriptions::SubscriptionRegistry,
};
use crate::events::{Bus, Event, EventKind};
use crate::sensor::{
    AuthorizationStatus, DeliveryQueue, SampleStream, SensorHandle, SensorProvider, StreamControl,
};

/// Both registries, guarded together.
struct Sessions<K, H> {
    handles: HandleRegistry<K, H>,
    streams: SubscriptionRegistry<K>,
}

/// Manages sensor handles and their update streams, keyed by `K`.
///
/// Construct one per provider and share it (e.g. behind an `Arc`); instances
/// are fully independent of each other.
pub struct SensorStreamManager<K, P: SensorProvider> {
    provider: P,
    cfg: Config,
    bus: Bus,
    sessions: Mutex<Sessions<K, P::Handle>>,
    runtime_token: CancellationToken,
}

impl<K, P> SensorStreamManager<K, P>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    P: SensorProvider,
{
    /// Creates a manager with default configuration and no subscribers.
    pub fn new(provider: P) -> Self {
        ManagerBuilder::new(provider).build()
    }

    /// Starts building a manager around `provider`.
    pub fn builder(provider: P) -> ManagerBuilder<K, P> {
        ManagerBuilder::new(provider)
    }

    pub(crate) fn from_parts(
        provider: P,
        cfg: Config,
        bus: Bus,
        runtime_token: CancellationToken,
    ) -> Self {
        let reporter = DiagnosticReporter::new(bus.clone(), cfg.panic_on_misuse);
        Self {
            provider,
            cfg,
            bus,
            sessions: Mutex::new(Sessions {
                handles: HandleRegistry::new(reporter),
                streams: SubscriptionRegistry::new(),
            }),
            runtime_token,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Event bus carrying lifecycle events and diagnostics.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Opens a sensor handle for `id`.
    ///
    /// A second `create` without `destroy` reports `DuplicateCreate` and keeps
    /// the existing handle.
    pub fn create(&self, id: &K) {
        let created = self
            .lock_sessions()
            .handles
            .create(id, || self.provider.open());
        if created {
            self.bus
                .publish(Event::new(EventKind::HandleCreated).with_session(label(id)));
        }
    }

    /// Releases the handle for `id`. Idempotent.
    ///
    /// With [`Config::stop_on_destroy`] an active stream is stopped first.
    pub fn destroy(&self, id: &K) {
        let released = {
            let mut sessions = self.lock_sessions();
            if self.cfg.stop_on_destroy {
                sessions.streams.cancel(id);
            }
            sessions.handles.destroy(id)
        };
        if released.is_some() {
            self.bus
                .publish(Event::new(EventKind::HandleDestroyed).with_session(label(id)));
        }
    }

    /// Whether the device supports relative altitude.
    pub fn is_available(&self) -> bool {
        self.provider.is_available()
    }

    /// Current permission state.
    pub fn authorization_status(&self) -> AuthorizationStatus {
        self.provider.authorization_status()
    }

    /// Starts hardware updates for `id`, delivered through `queue`.
    ///
    /// Returns an empty stream if `id` has no handle (reported as
    /// `HandleNotFound`) or already streams (the first stream stays live).
    /// Dropping the returned stream stops the hardware updates.
    pub fn start_updates(&self, id: &K, queue: &DeliveryQueue) -> SampleStream {
        let mut sessions = self.lock_sessions();

        let Some(handle) = sessions.handles.lookup(id, "start_updates") else {
            return SampleStream::empty();
        };
        if sessions.streams.is_occupied(id) {
            self.bus
                .publish(Event::new(EventKind::DuplicateStart).with_session(label(id)));
            return SampleStream::empty();
        }

        let handle: Arc<dyn SensorHandle> = handle;
        let (control, stream) =
            StreamControl::new(label(id), handle, self.cfg.stream_limit(), self.bus.clone());
        sessions.streams.register(id, &control);
        control.start(queue);
        stream
    }

    /// Stops the update stream for `id` and ends its consumer's stream.
    ///
    /// Reports `HandleNotFound` if `id` has no handle; no-op if it is not streaming.
    pub fn stop_updates(&self, id: &K) {
        let mut sessions = self.lock_sessions();
        if sessions.handles.lookup(id, "stop_updates").is_none() {
            return;
        }
        sessions.streams.cancel(id);
    }

    /// Identifiers that currently own a handle (unordered).
    pub fn sessions(&self) -> Vec<K> {
        self.lock_sessions().handles.ids()
    }

    /// Whether `id` has a stream that is still delivering.
    pub fn is_streaming(&self, id: &K) -> bool {
        self.lock_sessions().streams.is_active(id)
    }

    /// Whether `id` owns a handle.
    pub fn is_allocated(&self, id: &K) -> bool {
        self.lock_sessions().handles.contains(id)
    }

    /// Identifiers with a stream that is still delivering (unordered).
    pub fn streaming(&self) -> Vec<K> {
        self.lock_sessions().streams.active_ids()
    }

    /// Stops every stream and releases every handle.
    pub fn destroy_all(&self) {
        let released = {
            let mut sessions = self.lock_sessions();
            sessions.streams.cancel_all();
            sessions.handles.drain()
        };
        for (id, _) in released {
            self.bus
                .publish(Event::new(EventKind::HandleDestroyed).with_session(label(&id)));
        }
    }

    fn lock_sessions(&self) -> MutexGuard<'_, Sessions<K, P::Handle>> {
        lock(&self.sessions)
    }
}

impl<K, P: SensorProvider> Drop for SensorStreamManager<K, P> {
    fn drop(&mut self) {
        self.runtime_token.cancel();
    }
}

impl<K, P> Altimeter<K> for SensorStreamManager<K, P>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    P: SensorProvider,
{
    fn create(&self, id: &K) {
        SensorStreamManager::create(self, id);
    }

    fn destroy(&self, id: &K) {
        SensorStreamManager::destroy(self, id);
    }

    fn is_available(&self) -> bool {
        SensorStreamManager::is_available(self)
    }

    fn authorization_status(&self) -> AuthorizationStatus {
        SensorStreamManager::authorization_status(self)
    }

    fn start_updates(&self, id: &K, queue: &DeliveryQueue) -> SampleStream {
        SensorStreamManager::start_updates(self, id, queue)
    }

    fn stop_updates(&self, id: &K) {
        SensorStreamManager::stop_updates(self, id);
    }
}

fn label<K: Debug>(id: &K) -> Arc<str> {
    format!("{id:?}").into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SensorError;
    use crate::events::EventKind;
    use crate::sensor::{RelativeAltitudeSample, SimulatedAltimeter};
    use futures::StreamExt;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::broadcast;

    type Manager = SensorStreamManager<&'static str, Arc<SimulatedAltimeter>>;

    fn setup() -> (Manager, Arc<SimulatedAltimeter>) {
        let sim = Arc::new(SimulatedAltimeter::new());
        (SensorStreamManager::new(Arc::clone(&sim)), sim)
    }

    fn sample(alt: f64) -> RelativeAltitudeSample {
        RelativeAltitudeSample::new(Duration::from_millis(10), alt, 101.0)
    }

    fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<EventKind> {
        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        kinds
    }

    #[tokio::test]
    async fn start_before_create_is_noop_with_diagnostic() {
        let (mgr, sim) = setup();
        let mut rx = mgr.bus().subscribe();

        let mut stream = mgr.start_updates(&"a", &DeliveryQueue::inline());

        assert!(!stream.is_attached());
        assert!(stream.next().await.is_none());
        assert_eq!(drain(&mut rx), vec![EventKind::HandleNotFound]);
        assert!(sim.opened().is_empty());
        assert!(!mgr.is_allocated(&"a"));
    }

    #[tokio::test]
    async fn duplicate_create_keeps_first_handle_operative() {
        let (mgr, sim) = setup();
        let mut rx = mgr.bus().subscribe();

        mgr.create(&"a");
        mgr.create(&"a");
        assert_eq!(
            drain(&mut rx),
            vec![EventKind::HandleCreated, EventKind::DuplicateCreate]
        );
        assert_eq!(sim.opened().len(), 1);

        let mut stream = mgr.start_updates(&"a", &DeliveryQueue::inline());
        let handle = sim.last_opened().unwrap();
        assert!(handle.emit(sample(1.5)));
        assert_eq!(stream.next().await, Some(Ok(sample(1.5))));
    }

    #[tokio::test]
    async fn duplicate_start_delivers_to_one_stream_only() {
        let (mgr, sim) = setup();
        mgr.create(&"a");
        let mut rx = mgr.bus().subscribe();

        let mut first = mgr.start_updates(&"a", &DeliveryQueue::inline());
        let mut second = mgr.start_updates(&"a", &DeliveryQueue::inline());
        assert!(first.is_attached());
        assert!(!second.is_attached());
        assert_eq!(
            drain(&mut rx),
            vec![EventKind::UpdatesStarted, EventKind::DuplicateStart]
        );

        let handle = sim.last_opened().unwrap();
        assert_eq!(handle.begin_count(), 1);
        handle.emit(sample(2.0));

        assert!(second.next().await.is_none());
        assert_eq!(first.next().await, Some(Ok(sample(2.0))));
    }

    #[tokio::test]
    async fn dropping_consumer_stops_hardware_exactly_once() {
        let (mgr, sim) = setup();
        mgr.create(&"a");

        let stream = mgr.start_updates(&"a", &DeliveryQueue::inline());
        let handle = sim.last_opened().unwrap();
        assert!(mgr.is_streaming(&"a"));

        drop(stream);
        assert!(!mgr.is_streaming(&"a"));
        assert!(!handle.emit(sample(1.0)));

        mgr.stop_updates(&"a");
        mgr.destroy(&"a");
        assert_eq!((handle.begin_count(), handle.end_count()), (1, 1));
    }

    #[tokio::test]
    async fn stop_updates_ends_stream_and_allows_restart() {
        let (mgr, sim) = setup();
        mgr.create(&"a");

        let mut stream = mgr.start_updates(&"a", &DeliveryQueue::inline());
        mgr.stop_updates(&"a");
        assert!(stream.next().await.is_none());

        let mut again = mgr.start_updates(&"a", &DeliveryQueue::inline());
        assert!(again.is_attached());
        let handle = sim.last_opened().unwrap();
        handle.emit(sample(3.0));
        assert_eq!(again.next().await, Some(Ok(sample(3.0))));

        drop(stream);
        drop(again);
        assert_eq!((handle.begin_count(), handle.end_count()), (2, 2));
    }

    #[tokio::test]
    async fn late_callbacks_are_dropped_after_stop() {
        let (mgr, sim) = setup();
        mgr.create(&"a");
        let queue = DeliveryQueue::spawn_on(&tokio::runtime::Handle::current());

        let mut stream = mgr.start_updates(&"a", &queue);
        let handle = sim.last_opened().unwrap();

        // queued on the worker, which cannot run before we yield
        assert!(handle.emit(sample(9.9)));
        mgr.stop_updates(&"a");

        assert!(stream.next().await.is_none());
        assert_eq!(handle.end_count(), 1);
    }

    #[tokio::test]
    async fn destroy_then_start_matches_never_created() {
        let (mgr, _sim) = setup();
        mgr.create(&"a");
        mgr.destroy(&"a");
        let mut rx = mgr.bus().subscribe();

        let mut stream = mgr.start_updates(&"a", &DeliveryQueue::inline());

        assert!(!stream.is_attached());
        assert!(stream.next().await.is_none());
        assert_eq!(drain(&mut rx), vec![EventKind::HandleNotFound]);
        assert!(mgr.sessions().is_empty());
    }

    #[tokio::test]
    async fn stop_without_handle_reports() {
        let (mgr, _sim) = setup();
        let mut rx = mgr.bus().subscribe();

        mgr.stop_updates(&"ghost");
        mgr.destroy(&"ghost");

        assert_eq!(drain(&mut rx), vec![EventKind::HandleNotFound]);
    }

    #[tokio::test]
    async fn end_to_end_scenario() {
        let (mgr, sim) = setup();
        let queue = DeliveryQueue::spawn_on(&tokio::runtime::Handle::current());
        let t0 = Duration::from_secs(42);

        mgr.create(&"a");
        let mut stream = mgr.start_updates(&"a", &queue);
        let handle = sim.last_opened().unwrap();

        let expected = RelativeAltitudeSample::new(t0, 12.3, 98.5);
        assert!(handle.emit(expected));
        let got = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .unwrap();
        assert_eq!(got, Some(Ok(expected)));

        mgr.stop_updates(&"a");
        assert!(!handle.emit(RelativeAltitudeSample::new(t0, 13.0, 98.4)));
        assert!(stream.next().await.is_none());

        mgr.destroy(&"a");
        let mut rx = mgr.bus().subscribe();
        let mut after = mgr.start_updates(&"a", &queue);
        assert!(after.next().await.is_none());
        assert_eq!(drain(&mut rx), vec![EventKind::HandleNotFound]);
        assert_eq!((handle.begin_count(), handle.end_count()), (1, 1));
    }

    #[tokio::test]
    async fn sensor_error_terminates_only_its_stream() {
        let (mgr, sim) = setup();
        mgr.create(&"a");
        mgr.create(&"b");

        let mut a = mgr.start_updates(&"a", &DeliveryQueue::inline());
        let mut b = mgr.start_updates(&"b", &DeliveryQueue::inline());
        let [ha, hb] = <[_; 2]>::try_from(sim.opened()).ok().unwrap();

        ha.fail(SensorError::Fault {
            error: "overheated".into(),
        });
        hb.emit(sample(5.0));

        assert!(matches!(a.next().await, Some(Err(SensorError::Fault { .. }))));
        assert!(a.next().await.is_none());
        assert!(!mgr.is_streaming(&"a"));
        assert!(mgr.is_streaming(&"b"));
        assert_eq!(b.next().await, Some(Ok(sample(5.0))));

        // failed stream frees the slot
        let restarted = mgr.start_updates(&"a", &DeliveryQueue::inline());
        assert!(restarted.is_attached());
    }

    #[tokio::test]
    async fn destroy_stops_active_stream_by_default() {
        let (mgr, sim) = setup();
        mgr.create(&"a");
        let mut stream = mgr.start_updates(&"a", &DeliveryQueue::inline());
        let handle = sim.last_opened().unwrap();

        mgr.destroy(&"a");

        assert!(stream.next().await.is_none());
        assert_eq!(handle.end_count(), 1);
        assert!(mgr.streaming().is_empty());
    }

    #[tokio::test]
    async fn destroy_can_leave_stream_running() {
        let sim = Arc::new(SimulatedAltimeter::new());
        let cfg = Config {
            stop_on_destroy: false,
            ..Config::default()
        };
        let mgr: Manager = SensorStreamManager::builder(Arc::clone(&sim))
            .with_config(cfg)
            .build();

        mgr.create(&"a");
        let mut stream = mgr.start_updates(&"a", &DeliveryQueue::inline());
        let handle = sim.last_opened().unwrap();
        mgr.destroy(&"a");

        assert!(handle.emit(sample(7.0)));
        assert_eq!(stream.next().await, Some(Ok(sample(7.0))));

        // the orphaned stream still owns the slot
        mgr.create(&"a");
        assert!(!mgr.start_updates(&"a", &DeliveryQueue::inline()).is_attached());

        drop(stream);
        assert_eq!((handle.begin_count(), handle.end_count()), (1, 1));
    }

    #[tokio::test]
    async fn destroy_all_releases_everything() {
        let (mgr, sim) = setup();
        for id in ["a", "b", "c"] {
            mgr.create(&id);
        }
        let _a = mgr.start_updates(&"a", &DeliveryQueue::inline());
        let _b = mgr.start_updates(&"b", &DeliveryQueue::inline());

        mgr.destroy_all();

        assert!(mgr.sessions().is_empty());
        assert!(mgr.streaming().is_empty());
        for handle in sim.opened() {
            assert_eq!(handle.begin_count(), handle.end_count());
            assert!(!handle.is_streaming());
        }
    }

    #[test]
    fn queries_are_handle_independent() {
        let (mgr, sim) = setup();
        assert!(mgr.is_available());
        assert_eq!(mgr.authorization_status(), AuthorizationStatus::Authorized);

        sim.set_available(false);
        sim.set_authorization(AuthorizationStatus::Denied);
        assert!(!mgr.is_available());
        assert_eq!(mgr.authorization_status(), AuthorizationStatus::Denied);
        assert!(sim.opened().is_empty());
    }

    #[test]
    fn concurrent_create_opens_one_handle() {
        let (mgr, sim) = setup();
        let mut rx = mgr.bus().subscribe();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| mgr.create(&"shared"));
            }
        });

        let kinds = drain(&mut rx);
        assert_eq!(sim.opened().len(), 1);
        assert_eq!(
            kinds.iter().filter(|k| **k == EventKind::HandleCreated).count(),
            1
        );
        assert_eq!(
            kinds
                .iter()
                .filter(|k| **k == EventKind::DuplicateCreate)
                .count(),
            7
        );
    }

    #[test]
    fn concurrent_start_admits_one_stream() {
        let (mgr, sim) = setup();
        mgr.create(&"shared");

        let streams: Vec<SampleStream> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| mgr.start_updates(&"shared", &DeliveryQueue::inline())))
                .collect();
            workers.into_iter().filter_map(|w| w.join().ok()).collect()
        });

        assert_eq!(streams.iter().filter(|s| s.is_attached()).count(), 1);
        drop(streams);
        let handle = sim.last_opened().unwrap();
        assert_eq!((handle.begin_count(), handle.end_count()), (1, 1));
    }

    /// Handle whose `end_updates` takes a while, recording begin/end overlap.
    #[derive(Clone, Default)]
    struct SlowHandle {
        state: Arc<SlowState>,
    }

    #[derive(Default)]
    struct SlowState {
        active: AtomicBool,
        ending: AtomicBool,
        overlap: AtomicBool,
        begins: AtomicUsize,
    }

    impl SensorHandle for SlowHandle {
        fn begin_updates(&self, _queue: &DeliveryQueue, _handler: crate::sensor::UpdateHandler) {
            if self.state.ending.load(Ordering::SeqCst) {
                self.state.overlap.store(true, Ordering::SeqCst);
            }
            self.state.begins.fetch_add(1, Ordering::SeqCst);
            self.state.active.store(true, Ordering::SeqCst);
        }

        fn end_updates(&self) {
            self.state.ending.store(true, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(200));
            self.state.active.store(false, Ordering::SeqCst);
            self.state.ending.store(false, Ordering::SeqCst);
        }
    }

    struct SlowAltimeter {
        handle: SlowHandle,
    }

    impl SensorProvider for SlowAltimeter {
        type Handle = SlowHandle;

        fn is_available(&self) -> bool {
            true
        }

        fn authorization_status(&self) -> AuthorizationStatus {
            AuthorizationStatus::Authorized
        }

        fn open(&self) -> SlowHandle {
            self.handle.clone()
        }
    }

    #[test]
    fn restart_waits_for_inflight_teardown() {
        let handle = SlowHandle::default();
        let mgr: SensorStreamManager<&'static str, SlowAltimeter> =
            SensorStreamManager::new(SlowAltimeter {
                handle: handle.clone(),
            });
        mgr.create(&"a");
        let stream = mgr.start_updates(&"a", &DeliveryQueue::inline());

        let second = std::thread::scope(|scope| {
            let dropper = scope.spawn(move || drop(stream));
            std::thread::sleep(Duration::from_millis(50));

            // consumer teardown is still inside end_updates
            mgr.stop_updates(&"a");
            let second = mgr.start_updates(&"a", &DeliveryQueue::inline());
            let _ = dropper.join();
            second
        });

        assert!(!second.is_attached());
        assert!(!handle.state.overlap.load(Ordering::SeqCst));
        assert!(!mgr.is_streaming(&"a"));
        assert_eq!(handle.state.begins.load(Ordering::SeqCst), 1);

        // once the hardware is released the slot is free again
        let third = mgr.start_updates(&"a", &DeliveryQueue::inline());
        assert!(third.is_attached());
        assert!(handle.state.active.load(Ordering::SeqCst));
        assert!(mgr.is_streaming(&"a"));
    }

    #[tokio::test]
    async fn serial_queue_keeps_provider_order() {
        let (mgr, sim) = setup();
        let queue = DeliveryQueue::spawn_on(&tokio::runtime::Handle::current());
        mgr.create(&"a");
        let stream = mgr.start_updates(&"a", &queue);
        let handle = sim.last_opened().unwrap();

        for i in 0..20 {
            assert!(handle.emit(sample(f64::from(i))));
        }
        let got: Vec<f64> = tokio::time::timeout(
            Duration::from_secs(1),
            stream
                .take(20)
                .map(|item| item.map(|s| s.relative_altitude))
                .collect::<Vec<_>>(),
        )
        .await
        .unwrap()
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();

        let expected: Vec<f64> = (0..20).map(f64::from).collect();
        assert_eq!(got, expected);
    }

    #[test]
    #[should_panic(expected = "already exists")]
    fn strict_mode_panics_on_misuse() {
        let cfg = Config {
            panic_on_misuse: true,
            ..Config::default()
        };
        let mgr: Manager = SensorStreamManager::builder(Arc::new(SimulatedAltimeter::new()))
            .with_config(cfg)
            .build();
        mgr.create(&"a");
        mgr.create(&"a");
    }
}
