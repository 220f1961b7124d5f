//! # Altimeter capability set
//!
//! [`Altimeter`] is the interface application code depends on. The live
//! implementation is [`SensorStreamManager`](crate::SensorStreamManager);
//! tests can hand features a double instead.
//!
//! ## Example
//! ```rust
//! use altivisor::{Altimeter, DeliveryQueue, SampleStream};
//!
//! // a feature that only needs the capability set
//! fn begin_tracking<A: Altimeter<&'static str>>(altimeter: &A) -> Option<SampleStream> {
//!     if !altimeter.is_available() || !altimeter.authorization_status().is_authorized() {
//!         return None;
//!     }
//!     altimeter.create(&"hike");
//!     Some(altimeter.start_updates(&"hike", &DeliveryQueue::inline()))
//! }
//! ```

use crate::sensor::{AuthorizationStatus, DeliveryQueue, SampleStream};

/// Operations exposed for one relative-altitude capability.
///
/// All mutating operations are fire-and-forget: misuse is reported as a
/// diagnostic and never returned to the caller.
pub trait Altimeter<K>: Send + Sync {
    /// Opens a sensor handle for `id`.
    fn create(&self, id: &K);

    /// Releases the handle for `id`.
    fn destroy(&self, id: &K);

    /// Whether the device supports relative altitude at all.
    fn is_available(&self) -> bool;

    /// Current permission state.
    fn authorization_status(&self) -> AuthorizationStatus;

    /// Starts pushing updates for `id`, delivered via `queue`.
    fn start_updates(&self, id: &K, queue: &DeliveryQueue) -> SampleStream;

    /// Stops the update stream for `id`.
    fn stop_updates(&self, id: &K);
}
