//! # SimulatedAltimeter – in-process provider
//!
//! A [`SensorProvider`] with no hardware behind it. Readings are pushed by
//! hand through [`SimulatedHandle::emit`] / [`SimulatedHandle::fail`], which
//! makes it the test double for the manager and the backend for demos.
//!
//! Every handle counts its `begin_updates` / `end_updates` calls so callers can
//! check that streams are torn down exactly once.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use altivisor::{
//!     DeliveryQueue, RelativeAltitudeSample, SampleResult, SensorHandle, SensorProvider,
//!     SimulatedAltimeter,
//! };
//!
//! let sim = SimulatedAltimeter::new();
//! let handle = sim.open();
//! assert!(!handle.emit(RelativeAltitudeSample::new(Duration::ZERO, 0.0, 101.3)));
//!
//! handle.begin_updates(&DeliveryQueue::inline(), std::sync::Arc::new(|_: SampleResult| {}));
//! assert!(handle.is_streaming());
//! handle.end_updates();
//! assert_eq!((handle.begin_count(), handle.end_count()), (1, 1));
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::core::lock;
use crate::error::SensorError;
use crate::sensor::{
    AuthorizationStatus, DeliveryQueue, RelativeAltitudeSample, SampleResult, SensorHandle,
    SensorProvider, UpdateHandler,
};

struct Feed {
    queue: DeliveryQueue,
    handler: UpdateHandler,
}

#[derive(Default)]
struct HandleState {
    feed: Mutex<Option<Feed>>,
    begins: AtomicUsize,
    ends: AtomicUsize,
}

/// Handle produced by [`SimulatedAltimeter`]. Clones share state.
#[derive(Clone)]
pub struct SimulatedHandle {
    state: Arc<HandleState>,
}

impl SimulatedHandle {
    /// Pushes a reading through the delivery queue.
    ///
    /// Returns `false` if updates are not running.
    pub fn emit(&self, sample: RelativeAltitudeSample) -> bool {
        self.push(Ok(sample))
    }

    /// Pushes a failure through the delivery queue.
    ///
    /// Returns `false` if updates are not running.
    pub fn fail(&self, err: SensorError) -> bool {
        self.push(Err(err))
    }

    /// Number of `begin_updates` calls so far.
    pub fn begin_count(&self) -> usize {
        self.state.begins.load(Ordering::SeqCst)
    }

    /// Number of `end_updates` calls so far.
    pub fn end_count(&self) -> usize {
        self.state.ends.load(Ordering::SeqCst)
    }

    /// True between `begin_updates` and `end_updates`.
    pub fn is_streaming(&self) -> bool {
        lock(&self.state.feed).is_some()
    }

    fn push(&self, item: SampleResult) -> bool {
        let feed = {
            let guard = lock(&self.state.feed);
            guard
                .as_ref()
                .map(|f| (f.queue.clone(), Arc::clone(&f.handler)))
        };
        let Some((queue, handler)) = feed else {
            return false;
        };
        queue.dispatch(move || handler(item))
    }
}

impl SensorHandle for SimulatedHandle {
    fn begin_updates(&self, queue: &DeliveryQueue, handler: UpdateHandler) {
        self.state.begins.fetch_add(1, Ordering::SeqCst);
        *lock(&self.state.feed) = Some(Feed {
            queue: queue.clone(),
            handler,
        });
    }

    fn end_updates(&self) {
        self.state.ends.fetch_add(1, Ordering::SeqCst);
        drop(lock(&self.state.feed).take());
    }
}

/// In-process altimeter.
pub struct SimulatedAltimeter {
    available: AtomicBool,
    authorization: Mutex<AuthorizationStatus>,
    opened: Mutex<Vec<SimulatedHandle>>,
}

impl SimulatedAltimeter {
    /// Available and authorized.
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            authorization: Mutex::new(AuthorizationStatus::Authorized),
            opened: Mutex::new(Vec::new()),
        }
    }

    /// Sets what [`SensorProvider::is_available`] reports.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Sets what [`SensorProvider::authorization_status`] reports.
    pub fn set_authorization(&self, status: AuthorizationStatus) {
        *lock(&self.authorization) = status;
    }

    /// Every handle opened so far, oldest first.
    pub fn opened(&self) -> Vec<SimulatedHandle> {
        lock(&self.opened).clone()
    }

    /// Most recently opened handle.
    pub fn last_opened(&self) -> Option<SimulatedHandle> {
        lock(&self.opened).last().cloned()
    }
}

impl Default for SimulatedAltimeter {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorProvider for SimulatedAltimeter {
    type Handle = SimulatedHandle;

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn authorization_status(&self) -> AuthorizationStatus {
        *lock(&self.authorization)
    }

    fn open(&self) -> SimulatedHandle {
        let handle = SimulatedHandle {
            state: Arc::new(HandleState::default()),
        };
        lock(&self.opened).push(handle.clone());
        handle
    }
}
