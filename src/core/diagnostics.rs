//! # Diagnostic reporter
//!
//! Sink for [`ProgrammerError`]s. Misuse is published on the [`Bus`] as a
//! diagnostic event and the offending operation carries on as a no-op.
//!
//! ```text
//! report(err) ──► Bus.publish(DuplicateCreate | HandleNotFound)
//!             └─► panic!(err)   only with Config::panic_on_misuse
//! ```

use crate::error::ProgrammerError;
use crate::events::{Bus, Event};

/// Publishes programmer errors without interrupting the caller.
#[derive(Clone, Debug)]
pub struct DiagnosticReporter {
    bus: Bus,
    panic_on_misuse: bool,
}

impl DiagnosticReporter {
    /// Creates a reporter publishing to `bus`.
    pub fn new(bus: Bus, panic_on_misuse: bool) -> Self {
        Self {
            bus,
            panic_on_misuse,
        }
    }

    /// Reports a misuse condition.
    ///
    /// # Panics
    /// Only when constructed with `panic_on_misuse`.
    pub fn report(&self, err: ProgrammerError) {
        self.bus.publish(Event::programmer_error(&err));
        if self.panic_on_misuse {
            panic!("{err}");
        }
    }
}
