//! # Event subscribers.
//!
//! ```text
//! SensorStreamManager ── publish(Event) ──► Bus ──► bus listener ──► SubscriberSet
//!                                                                      ├──► LogWriter
//!                                                                      └──► custom Subscribe impls
//! ```
//!
//! ## Implementing custom subscribers
//! ```rust
//! use altivisor::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct MisuseCounter(std::sync::atomic::AtomicUsize);
//!
//! #[async_trait]
//! impl Subscribe for MisuseCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.is_diagnostic() {
//!             self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "misuse_counter"
//!     }
//! }
//! ```

#[cfg(feature = "logging")]
mod embedded;
mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
