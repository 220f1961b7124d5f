//! # Sensor provider contract
//!
//! The hardware/OS motion service is an external collaborator. The manager
//! only needs two seams from it:
//!
//! - [`SensorProvider`]: device-wide queries and a factory for handles.
//! - [`SensorHandle`]: one live connection that can push updates.
//!
//! ## Contract
//! - `begin_updates` registers `handler` and returns immediately; the provider
//!   then pushes each reading (or a terminal error) through `handler`.
//! - The handler **must** be invoked through the given [`DeliveryQueue`] so the
//!   caller controls where delivery happens.
//! - After `end_updates` returns the provider stops invoking the handler.
//!   The manager calls `end_updates` exactly once per `begin_updates`.

use std::sync::Arc;

use crate::error::SensorError;
use crate::sensor::{AuthorizationStatus, DeliveryQueue, RelativeAltitudeSample};

/// Item type of a sample stream and argument of an [`UpdateHandler`].
pub type SampleResult = Result<RelativeAltitudeSample, SensorError>;

/// Callback the provider invokes for every reading or failure.
pub type UpdateHandler = Arc<dyn Fn(SampleResult) + Send + Sync + 'static>;

/// A live connection to the altimeter hardware.
pub trait SensorHandle: Send + Sync + 'static {
    /// Starts pushing updates to `handler`, delivered via `queue`.
    fn begin_updates(&self, queue: &DeliveryQueue, handler: UpdateHandler);

    /// Stops the hardware stream started by [`begin_updates`](Self::begin_updates).
    fn end_updates(&self);
}

/// Device-level access to the relative-altitude capability.
pub trait SensorProvider: Send + Sync + 'static {
    /// Handle type produced by [`open`](Self::open).
    type Handle: SensorHandle;

    /// Whether the device has the capability at all.
    fn is_available(&self) -> bool;

    /// Current permission state.
    fn authorization_status(&self) -> AuthorizationStatus;

    /// Opens a new, idle handle.
    fn open(&self) -> Self::Handle;
}

impl<P: SensorProvider> SensorProvider for Arc<P> {
    type Handle = P::Handle;

    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn authorization_status(&self) -> AuthorizationStatus {
        (**self).authorization_status()
    }

    fn open(&self) -> Self::Handle {
        (**self).open()
    }
}
