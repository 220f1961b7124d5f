//! # Sensor-facing types.
//!
//! - [`SensorProvider`] / [`SensorHandle`]: the contract with the hardware service
//! - [`RelativeAltitudeSample`], [`AuthorizationStatus`]: values passed through
//! - [`DeliveryQueue`]: where provider callbacks are executed
//! - [`SampleStream`]: consumer side of an update subscription
//! - [`SimulatedAltimeter`]: in-process provider for tests and demos

mod provider;
mod queue;
mod sample;
mod simulated;
mod stream;

pub use provider::{SampleResult, SensorHandle, SensorProvider, UpdateHandler};
pub use queue::DeliveryQueue;
pub use sample::{AuthorizationStatus, RelativeAltitudeSample};
pub use simulated::{SimulatedAltimeter, SimulatedHandle};
pub use stream::SampleStream;

pub(crate) use stream::StreamControl;
