//! Manager core: registries, diagnostics and orchestration.
//!
//! The public API from this module is [`SensorStreamManager`] (with its
//! [`ManagerBuilder`] and [`Config`]), the [`Altimeter`] capability trait and
//! the [`DiagnosticReporter`].
//!
//! Internal modules:
//! - [`handles`]: identifier → sensor handle, misuse reporting;
//! - [`subscriptions`]: identifier → active stream, cancellation;
//! - [`manager`]: the state machine tying both together.

mod altimeter;
mod builder;
mod config;
mod diagnostics;
mod handles;
mod manager;
mod subscriptions;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use altimeter::Altimeter;
pub use builder::ManagerBuilder;
pub use config::Config;
pub use diagnostics::DiagnosticReporter;
pub use manager::SensorStreamManager;

/// Locks `m`, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
