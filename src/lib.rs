//! # altivisor
//!
//! **Altivisor** manages relative-altitude (barometric altimeter) sensor
//! sessions for Rust applications.
//!
//! It keeps one sensor handle per caller-chosen identifier, allows at most one
//! live update stream per handle, and tears hardware streams down exactly once
//! no matter how the consumer goes away. Misuse (double create, operating on
//! an identifier that was never created) is reported as a diagnostic event
//! instead of crashing.
//!
//! ## Architecture
//! ```text
//!   caller: create / start_updates / stop_updates / destroy (any thread)
//!        │
//!        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  SensorStreamManager<K, P>                                        │
//! │  - HandleRegistry        (identifier → provider handle)           │
//! │  - SubscriptionRegistry  (identifier → StreamControl)             │
//! │  - DiagnosticReporter    (DuplicateCreate, HandleNotFound)        │
//! └──────┬───────────────────────────────┬─────────────────────┬──────┘
//!        │ open / begin / end            │ SampleStream        │ publish
//!        ▼                               ▼                     ▼
//! ┌──────────────────┐   handler   ┌─────────────┐   ┌──────────────────┐
//! │ SensorProvider   │ ──────────► │ consumer    │   │ Bus (broadcast)  │
//! │ (via DeliveryQ.) │  Ok/Err     │ (Stream)    │   └────────┬─────────┘
//! └──────────────────┘             └─────────────┘            ▼
//!                                                     bus listener
//!                                                          ▼
//!                                                   SubscriberSet
//!                                                ┌─────────┼─────────┐
//!                                                ▼         ▼         ▼
//!                                             LogWriter  sub2 ...  subN
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                           |
//! |-------------------|----------------------------------------------------------|----------------------------------------------|
//! | **Manager**       | Handle lifecycle and single-stream-per-handle updates.   | [`SensorStreamManager`], [`Altimeter`]       |
//! | **Provider seam** | Plug in the hardware service or a simulated one.         | [`SensorProvider`], [`SensorHandle`]         |
//! | **Delivery**      | Choose where provider callbacks run.                     | [`DeliveryQueue`], [`SampleStream`]          |
//! | **Events**        | Lifecycle, diagnostics and failures on a broadcast bus.  | [`Event`], [`EventKind`], [`Subscribe`]      |
//! | **Errors**        | Misuse reports and per-stream sensor failures.           | [`ProgrammerError`], [`SensorError`]         |
//! | **Configuration** | Buffering, destroy semantics, strict misuse mode.        | [`Config`], [`ManagerBuilder`]               |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use futures::StreamExt;
//! use altivisor::{DeliveryQueue, RelativeAltitudeSample, SensorStreamManager, SimulatedAltimeter};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let sim = std::sync::Arc::new(SimulatedAltimeter::new());
//!     let mgr = SensorStreamManager::new(sim.clone());
//!
//!     mgr.create(&"hike");
//!     let mut updates = mgr.start_updates(&"hike", &DeliveryQueue::inline());
//!
//!     if let Some(handle) = sim.last_opened() {
//!         handle.emit(RelativeAltitudeSample::new(Duration::ZERO, 12.3, 98.5));
//!     }
//!     let first = updates.next().await;
//!     assert_eq!(first.map(|r| r.map(|s| s.relative_altitude)), Some(Ok(12.3)));
//!
//!     mgr.stop_updates(&"hike");
//!     assert!(updates.next().await.is_none());
//!     mgr.destroy(&"hike");
//! }
//! ```
mod core;
mod error;
mod events;
mod sensor;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{Altimeter, Config, DiagnosticReporter, ManagerBuilder, SensorStreamManager};
pub use error::{ProgrammerError, SensorError};
pub use events::{Bus, Event, EventKind};
pub use sensor::{
    AuthorizationStatus, DeliveryQueue, RelativeAltitudeSample, SampleResult, SampleStream,
    SensorHandle, SensorProvider, SimulatedAltimeter, SimulatedHandle, UpdateHandler,
};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
