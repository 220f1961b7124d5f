//! # Sample streams and their teardown control.
//!
//! Bridges the callback-driven provider to a pull-based [`Stream`]:
//!
//! ```text
//! provider ── handler(item) ──► StreamControl::on_update
//!                                   │  token cancelled? ──► drop
//!                                   ├─ Ok(sample) ──► try_send ──► [channel] ──► SampleStream::poll_next
//!                                   └─ Err(e)     ──► send Err, then cancel()
//!
//! cancel() (exactly once, from any of):
//!   SampleStream dropped │ stop_updates │ destroy │ terminal error
//!     ├─► token.cancel()           (handler ignores late callbacks)
//!     ├─► drop sender              (consumer sees end of stream)
//!     ├─► handle.end_updates()     (only if begin_updates ran)
//!     └─► publish UpdatesStopped
//! ```
//!
//! ## States
//! ```text
//! Idle ──start──► Started ──cancel──► Stopping ──end_updates──► Finished
//!   └────────────────cancel─────────────┘
//! ```
//! A control only frees its registry slot once `Finished`: no new
//! `begin_updates` can reach a handle before the previous `end_updates` returned.
//!
//! ## Rules
//! - `end_updates` runs exactly once per `begin_updates`, even if `cancel`
//!   races with `start` (or runs from inside `begin_updates`).
//! - Nothing is forwarded once `cancel` has returned.
//! - A bounded channel keeps one slot in reserve for the terminal error.

use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::lock;
use crate::error::SensorError;
use crate::events::{Bus, Event, EventKind};
use crate::sensor::{DeliveryQueue, RelativeAltitudeSample, SampleResult, SensorHandle, UpdateHandler};

const IDLE: u8 = 0;
const STARTED: u8 = 1;
const STOPPING: u8 = 2;
const FINISHED: u8 = 3;

enum SampleSender {
    Unbounded(mpsc::UnboundedSender<SampleResult>),
    Bounded(mpsc::Sender<SampleResult>),
}

enum SampleReceiver {
    Unbounded(mpsc::UnboundedReceiver<SampleResult>),
    Bounded(mpsc::Receiver<SampleResult>),
}

enum Forward {
    Sent,
    Full,
    Closed,
}

impl SampleSender {
    fn send_sample(&self, sample: RelativeAltitudeSample) -> Forward {
        match self {
            SampleSender::Unbounded(tx) => match tx.send(Ok(sample)) {
                Ok(()) => Forward::Sent,
                Err(_) => Forward::Closed,
            },
            SampleSender::Bounded(tx) => {
                if tx.is_closed() {
                    return Forward::Closed;
                }
                // last slot is reserved for the terminal error
                if tx.capacity() <= 1 {
                    return Forward::Full;
                }
                match tx.try_send(Ok(sample)) {
                    Ok(()) => Forward::Sent,
                    Err(mpsc::error::TrySendError::Full(_)) => Forward::Full,
                    Err(mpsc::error::TrySendError::Closed(_)) => Forward::Closed,
                }
            }
        }
    }

    fn send_error(&self, err: SensorError) {
        match self {
            SampleSender::Unbounded(tx) => {
                let _ = tx.send(Err(err));
            }
            SampleSender::Bounded(tx) => {
                let _ = tx.try_send(Err(err));
            }
        }
    }
}

/// Creates the bridging channel; `None` means unbounded.
fn channel(capacity: Option<usize>) -> (SampleSender, SampleReceiver) {
    match capacity {
        None => {
            let (tx, rx) = mpsc::unbounded_channel();
            (SampleSender::Unbounded(tx), SampleReceiver::Unbounded(rx))
        }
        Some(n) => {
            let (tx, rx) = mpsc::channel(n.max(1) + 1);
            (SampleSender::Bounded(tx), SampleReceiver::Bounded(rx))
        }
    }
}

/// Shared teardown state of one active subscription.
///
/// Owned jointly by the subscription registry and the consumer's
/// [`SampleStream`]; the provider's handler only holds a weak reference.
pub(crate) struct StreamControl {
    session: Arc<str>,
    handle: Arc<dyn SensorHandle>,
    token: CancellationToken,
    state: AtomicU8,
    sender: Mutex<Option<SampleSender>>,
    forwarded: AtomicU64,
    bus: Bus,
}

impl StreamControl {
    /// Creates a control plus the consumer side of its channel.
    pub(crate) fn new(
        session: Arc<str>,
        handle: Arc<dyn SensorHandle>,
        capacity: Option<usize>,
        bus: Bus,
    ) -> (Arc<Self>, SampleStream) {
        let (tx, rx) = channel(capacity);
        let control = Arc::new(Self {
            session,
            handle,
            token: CancellationToken::new(),
            state: AtomicU8::new(IDLE),
            sender: Mutex::new(Some(tx)),
            forwarded: AtomicU64::new(0),
            bus,
        });
        let stream = SampleStream {
            rx: Some(rx),
            control: Some(Arc::clone(&control)),
        };
        (control, stream)
    }

    /// True once teardown has begun; the stream no longer delivers.
    #[inline]
    pub(crate) fn is_stopped(&self) -> bool {
        self.state.load(Ordering::Acquire) >= STOPPING
    }

    /// True once the hardware stream is fully released.
    #[inline]
    pub(crate) fn is_finished(&self) -> bool {
        self.state.load(Ordering::Acquire) == FINISHED
    }

    /// Calls `begin_updates` on the handle.
    ///
    /// Inline providers may deliver (and fail) synchronously from inside
    /// `begin_updates`; the handler never takes the session lock.
    pub(crate) fn start(self: &Arc<Self>, queue: &DeliveryQueue) {
        if self.is_stopped() {
            self.state.store(FINISHED, Ordering::Release);
            return;
        }

        let weak = Arc::downgrade(self);
        let handler: UpdateHandler = Arc::new(move |item: SampleResult| {
            if let Some(control) = weak.upgrade() {
                control.on_update(item);
            }
        });

        self.bus
            .publish(Event::new(EventKind::UpdatesStarted).with_session(Arc::clone(&self.session)));
        self.handle.begin_updates(queue, handler);

        if self
            .state
            .compare_exchange(IDLE, STARTED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // cancelled while begin_updates was running; cancel() left end to us
            self.handle.end_updates();
            self.state.store(FINISHED, Ordering::Release);
        }
    }

    /// Tears the subscription down. Returns `false` if it was already stopped.
    pub(crate) fn cancel(&self) -> bool {
        let Ok(prev) = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
                (s < STOPPING).then_some(STOPPING)
            })
        else {
            return false;
        };

        self.token.cancel();
        drop(lock(&self.sender).take());

        if prev == STARTED {
            self.handle.end_updates();
            self.state.store(FINISHED, Ordering::Release);
        }

        self.bus.publish(
            Event::new(EventKind::UpdatesStopped)
                .with_session(Arc::clone(&self.session))
                .with_samples(self.forwarded.load(Ordering::Relaxed)),
        );
        true
    }

    fn on_update(&self, item: SampleResult) {
        if self.token.is_cancelled() {
            return;
        }
        match item {
            Ok(sample) => self.forward(sample),
            Err(err) => {
                self.bus.publish(
                    Event::new(EventKind::StreamFailed)
                        .with_session(Arc::clone(&self.session))
                        .with_reason(err.to_string()),
                );
                if let Some(tx) = lock(&self.sender).as_ref() {
                    tx.send_error(err);
                }
                self.cancel();
            }
        }
    }

    fn forward(&self, sample: RelativeAltitudeSample) {
        let guard = lock(&self.sender);
        let Some(tx) = guard.as_ref() else {
            return;
        };
        match tx.send_sample(sample) {
            Forward::Sent => {
                self.forwarded.fetch_add(1, Ordering::Relaxed);
            }
            Forward::Full => {
                self.bus.publish(
                    Event::new(EventKind::SampleDropped)
                        .with_session(Arc::clone(&self.session))
                        .with_reason("full"),
                );
            }
            // consumer is gone; its drop path tears the stream down
            Forward::Closed => {}
        }
    }
}

/// Consumer side of [`start_updates`](crate::SensorStreamManager::start_updates).
///
/// Yields `Ok(sample)` per reading and at most one terminal `Err`. A stream
/// produced by a rejected `start_updates` is not attached to any sensor: it
/// ends immediately.
///
/// Dropping an attached stream stops the hardware updates synchronously.
pub struct SampleStream {
    rx: Option<SampleReceiver>,
    control: Option<Arc<StreamControl>>,
}

impl SampleStream {
    /// A stream that yields nothing.
    pub fn empty() -> Self {
        Self {
            rx: None,
            control: None,
        }
    }

    /// `false` for the no-op stream returned by a rejected `start_updates`.
    #[inline]
    pub fn is_attached(&self) -> bool {
        self.control.is_some()
    }

    /// Stops the hardware updates now and ends the stream.
    ///
    /// Buffered items are discarded.
    pub fn cancel(&mut self) {
        if let Some(control) = self.control.take() {
            control.cancel();
        }
        self.rx = None;
    }
}

impl Stream for SampleStream {
    type Item = SampleResult;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let Some(rx) = this.rx.as_mut() else {
            return Poll::Ready(None);
        };
        let polled = match rx {
            SampleReceiver::Unbounded(rx) => rx.poll_recv(cx),
            SampleReceiver::Bounded(rx) => rx.poll_recv(cx),
        };
        if let Poll::Ready(None) = polled {
            this.rx = None;
        }
        polled
    }
}

impl Drop for SampleStream {
    fn drop(&mut self) {
        if let Some(control) = self.control.take() {
            control.cancel();
        }
    }
}

impl fmt::Debug for SampleStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleStream")
            .field("attached", &self.is_attached())
            .field("open", &self.rx.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::{SensorProvider, SimulatedAltimeter};
    use futures::StreamExt;
    use std::time::Duration;

    fn sample(alt: f64) -> RelativeAltitudeSample {
        RelativeAltitudeSample::new(Duration::from_secs(1), alt, 100.0)
    }

    fn control_for(
        handle: Arc<dyn SensorHandle>,
        capacity: Option<usize>,
    ) -> (Arc<StreamControl>, SampleStream) {
        StreamControl::new("\"t\"".into(), handle, capacity, Bus::new(16))
    }

    #[tokio::test]
    async fn empty_stream_ends_immediately() {
        let mut s = SampleStream::empty();
        assert!(!s.is_attached());
        assert!(s.next().await.is_none());
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let sim = SimulatedAltimeter::new();
        let handle = sim.open();
        let (control, stream) = control_for(Arc::new(handle.clone()), None);

        control.start(&DeliveryQueue::inline());
        assert!(handle.is_streaming());
        assert!(!control.is_stopped());

        assert!(control.cancel());
        assert!(!control.cancel());
        drop(stream);

        assert!(control.is_finished());
        assert_eq!(handle.begin_count(), 1);
        assert_eq!(handle.end_count(), 1);
    }

    #[tokio::test]
    async fn cancel_before_start_never_begins() {
        let sim = SimulatedAltimeter::new();
        let handle = sim.open();
        let (control, _stream) = control_for(Arc::new(handle.clone()), None);

        control.cancel();
        assert!(!control.is_finished());
        control.start(&DeliveryQueue::inline());

        assert!(control.is_finished());
        assert_eq!(handle.begin_count(), 0);
        assert_eq!(handle.end_count(), 0);
    }

    #[tokio::test]
    async fn dropping_stream_stops_hardware() {
        let sim = SimulatedAltimeter::new();
        let handle = sim.open();
        let (control, stream) = control_for(Arc::new(handle.clone()), None);
        control.start(&DeliveryQueue::inline());

        drop(stream);

        assert!(control.is_finished());
        assert!(!handle.is_streaming());
        assert!(!handle.emit(sample(1.0)));
        assert_eq!(handle.end_count(), 1);
    }

    #[tokio::test]
    async fn terminal_error_ends_stream() {
        let sim = SimulatedAltimeter::new();
        let handle = sim.open();
        let (control, mut stream) = control_for(Arc::new(handle.clone()), None);
        control.start(&DeliveryQueue::inline());

        assert!(handle.emit(sample(1.0)));
        assert!(handle.fail(SensorError::NotAuthorized));
        assert!(!handle.emit(sample(2.0)));

        assert_eq!(stream.next().await, Some(Ok(sample(1.0))));
        assert_eq!(stream.next().await, Some(Err(SensorError::NotAuthorized)));
        assert_eq!(stream.next().await, None);
        assert!(control.is_finished());
        assert_eq!(handle.end_count(), 1);
    }

    #[tokio::test]
    async fn explicit_cancel_discards_buffer() {
        let sim = SimulatedAltimeter::new();
        let handle = sim.open();
        let (control, mut stream) = control_for(Arc::new(handle.clone()), None);
        control.start(&DeliveryQueue::inline());

        assert!(handle.emit(sample(1.0)));
        assert!(handle.emit(sample(2.0)));
        stream.cancel();

        assert!(!stream.is_attached());
        assert!(stream.next().await.is_none());
        assert!(!handle.emit(sample(3.0)));
        drop(stream);

        assert!(control.is_finished());
        assert_eq!((handle.begin_count(), handle.end_count()), (1, 1));
    }

    #[tokio::test]
    async fn bounded_stream_drops_overflow_but_keeps_error() {
        let sim = SimulatedAltimeter::new();
        let handle = sim.open();
        let (control, mut stream) = control_for(Arc::new(handle.clone()), Some(2));
        control.start(&DeliveryQueue::inline());

        for i in 0..5 {
            handle.emit(sample(f64::from(i)));
        }
        handle.fail(SensorError::Unavailable);

        assert_eq!(stream.next().await, Some(Ok(sample(0.0))));
        assert_eq!(stream.next().await, Some(Ok(sample(1.0))));
        assert_eq!(stream.next().await, Some(Err(SensorError::Unavailable)));
        assert_eq!(stream.next().await, None);
    }
}
