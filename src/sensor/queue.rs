//! # Delivery queue
//!
//! [`DeliveryQueue`] decides **where** provider callbacks run, independent of
//! the thread the driver fires them on.
//!
//! ```text
//! driver thread ── dispatch(job) ──► Inline:  job() right here
//!                                └─► Serial:  [unbounded FIFO] ──► worker task on a tokio runtime
//! ```
//!
//! ## Rules
//! - **FIFO**: a serial queue runs jobs one at a time, in dispatch order.
//! - **Isolation**: a panicking job is caught; the worker keeps running.
//! - **Lifetime**: the worker exits once every clone of the queue is dropped.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tokio::runtime::Handle;
use tokio::sync::mpsc;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Execution context for sensor callbacks.
#[derive(Clone)]
pub struct DeliveryQueue {
    kind: QueueKind,
}

#[derive(Clone)]
enum QueueKind {
    Inline,
    Serial(mpsc::UnboundedSender<Job>),
}

impl DeliveryQueue {
    /// Runs every job immediately on the dispatching thread.
    pub fn inline() -> Self {
        Self {
            kind: QueueKind::Inline,
        }
    }

    /// Spawns a serial worker on `runtime` and returns a queue feeding it.
    pub fn spawn_on(runtime: &Handle) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        runtime.spawn(async move {
            while let Some(job) = rx.recv().await {
                let _ = catch_unwind(AssertUnwindSafe(job));
            }
        });
        Self {
            kind: QueueKind::Serial(tx),
        }
    }

    /// Schedules `job`.
    ///
    /// Returns `false` if the serial worker is gone and the job was dropped.
    pub fn dispatch(&self, job: impl FnOnce() + Send + 'static) -> bool {
        match &self.kind {
            QueueKind::Inline => {
                job();
                true
            }
            QueueKind::Serial(tx) => tx.send(Box::new(job)).is_ok(),
        }
    }

    /// True for [`DeliveryQueue::inline`].
    #[inline]
    pub fn is_inline(&self) -> bool {
        matches!(self.kind, QueueKind::Inline)
    }
}

impl Default for DeliveryQueue {
    fn default() -> Self {
        Self::inline()
    }
}

impl fmt::Debug for DeliveryQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_inline() {
            f.write_str("DeliveryQueue::Inline")
        } else {
            f.write_str("DeliveryQueue::Serial")
        }
    }
}
