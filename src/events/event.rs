//! # Events emitted by the sensor stream manager.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Session events**: handle and stream lifecycle (created, started, stopped, failed)
//! - **Diagnostics**: non-fatal misuse reported by the [`DiagnosticReporter`](crate::DiagnosticReporter)
//! - **Delivery events**: subscriber/stream back-pressure and panics
//!
//! The [`Event`] struct carries the session identifier (rendered with `Debug`),
//! a human-readable reason and, for stopped streams, the number of forwarded samples.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use altivisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::StreamFailed)
//!     .with_session("\"kitchen\"")
//!     .with_reason("sensor fault: bus error");
//!
//! assert_eq!(ev.kind, EventKind::StreamFailed);
//! assert_eq!(ev.session.as_deref(), Some("\"kitchen\""));
//! assert!(!ev.is_diagnostic());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::error::ProgrammerError;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of manager events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Session lifecycle ===
    /// A sensor handle was opened for a session.
    ///
    /// Sets:
    /// - `session`: identifier
    HandleCreated,

    /// A sensor handle was released.
    ///
    /// Sets:
    /// - `session`: identifier
    HandleDestroyed,

    /// Hardware updates were requested for a session.
    ///
    /// Sets:
    /// - `session`: identifier
    UpdatesStarted,

    /// Hardware updates were stopped (consumer dropped, `stop_updates`,
    /// `destroy`, or a terminal sensor error).
    ///
    /// Sets:
    /// - `session`: identifier
    /// - `samples`: number of samples forwarded to the consumer
    UpdatesStopped,

    /// The provider reported an error; the stream was terminated.
    ///
    /// Sets:
    /// - `session`: identifier
    /// - `reason`: sensor error message
    StreamFailed,

    /// A sample was dropped because the bounded stream buffer was full.
    ///
    /// Sets:
    /// - `session`: identifier
    SampleDropped,

    // === Diagnostics ===
    /// `create` was called for a session that already has a handle.
    ///
    /// Sets:
    /// - `session`: identifier
    /// - `reason`: diagnostic message
    DuplicateCreate,

    /// An operation referenced a session without a handle.
    ///
    /// Sets:
    /// - `session`: identifier
    /// - `reason`: diagnostic message (names the operation)
    HandleNotFound,

    /// `start_updates` was called while a stream is already active.
    ///
    /// Sets:
    /// - `session`: identifier
    DuplicateStart,

    // === Subscriber events ===
    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `session`: subscriber name
    /// - `reason`: "full" or "closed"
    SubscriberOverflow,

    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `session`: subscriber name
    /// - `reason`: panic message
    SubscriberPanicked,
}

/// Manager event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Session identifier (or subscriber name), if applicable.
    pub session: Option<Arc<str>>,
    /// Human-readable reason (errors, diagnostics, overflow details).
    pub reason: Option<Arc<str>>,
    /// Number of samples forwarded by a stream.
    pub samples: Option<u64>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            session: None,
            reason: None,
            samples: None,
        }
    }

    /// Attaches a session label.
    #[inline]
    pub fn with_session(mut self, session: impl Into<Arc<str>>) -> Self {
        self.session = Some(session.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a forwarded sample count.
    #[inline]
    pub fn with_samples(mut self, n: u64) -> Self {
        self.samples = Some(n);
        self
    }

    /// Creates a diagnostic event from a programmer error.
    pub fn programmer_error(err: &ProgrammerError) -> Self {
        let kind = match err {
            ProgrammerError::DuplicateCreate { .. } => EventKind::DuplicateCreate,
            ProgrammerError::HandleNotFound { .. } => EventKind::HandleNotFound,
        };
        Event::new(kind)
            .with_session(err.session())
            .with_reason(err.to_string())
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_session(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_session(subscriber)
            .with_reason(info)
    }

    /// True for misuse reports (`DuplicateCreate`, `HandleNotFound`).
    #[inline]
    pub fn is_diagnostic(&self) -> bool {
        matches!(
            self.kind,
            EventKind::DuplicateCreate | EventKind::HandleNotFound
        )
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }
}
