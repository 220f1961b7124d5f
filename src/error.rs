//! Error types used by the sensor stream manager and its providers.
//!
//! This module defines two main error enums:
//!
//! - [`ProgrammerError`]: caller misuse; reported as a diagnostic, never returned.
//! - [`SensorError`]: failures reported by the sensor provider mid-stream.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging.

use thiserror::Error;

/// # Misuse of the manager by its caller.
///
/// These never propagate to the caller: the [`DiagnosticReporter`](crate::DiagnosticReporter)
/// publishes them and the offending operation degrades to a no-op.
/// Identifiers are stored pre-rendered with `Debug`.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgrammerError {
    /// `create` was called for an identifier that already has a live handle.
    #[error(
        "a sensor handle with id {id} already exists; destroy it before creating a new one \
         (the existing handle is kept)"
    )]
    DuplicateCreate {
        /// Offending identifier.
        id: String,
    },

    /// An operation referenced an identifier with no live handle.
    #[error(
        "no sensor handle with id {id} for {op}; create the handle before using it \
         and do not use it after destroy"
    )]
    HandleNotFound {
        /// Offending identifier.
        id: String,
        /// Operation that needed the handle.
        op: &'static str,
    },
}

impl ProgrammerError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use altivisor::ProgrammerError;
    ///
    /// let err = ProgrammerError::DuplicateCreate { id: "1".into() };
    /// assert_eq!(err.as_label(), "duplicate_create");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ProgrammerError::DuplicateCreate { .. } => "duplicate_create",
            ProgrammerError::HandleNotFound { .. } => "handle_not_found",
        }
    }

    /// Returns a compact message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ProgrammerError::DuplicateCreate { id } => format!("duplicate create: id={id}"),
            ProgrammerError::HandleNotFound { id, op } => {
                format!("handle not found: id={id} op={op}")
            }
        }
    }

    /// Rendered identifier the error refers to.
    pub fn session(&self) -> &str {
        match self {
            ProgrammerError::DuplicateCreate { id } | ProgrammerError::HandleNotFound { id, .. } => {
                id
            }
        }
    }
}

/// # Errors produced by a sensor provider.
///
/// Delivered to the consumer of a single stream as its terminal item; other
/// sessions are unaffected.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    /// The device has no relative-altitude capability.
    #[error("relative altitude is not available on this device")]
    Unavailable,

    /// Access was denied or revoked.
    #[error("not authorized to read relative altitude")]
    NotAuthorized,

    /// Hardware or driver failure.
    #[error("sensor fault: {error}")]
    Fault {
        /// The underlying error message.
        error: String,
    },
}

impl SensorError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use altivisor::SensorError;
    ///
    /// let err = SensorError::Fault { error: "i2c nack".into() };
    /// assert_eq!(err.as_label(), "sensor_fault");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SensorError::Unavailable => "sensor_unavailable",
            SensorError::NotAuthorized => "sensor_not_authorized",
            SensorError::Fault { .. } => "sensor_fault",
        }
    }

    /// Returns a compact message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SensorError::Unavailable => "unavailable".to_string(),
            SensorError::NotAuthorized => "not authorized".to_string(),
            SensorError::Fault { error } => format!("fault: {error}"),
        }
    }

    /// Whether the failure comes from the permission model rather than the hardware.
    pub fn is_authorization(&self) -> bool {
        matches!(self, SensorError::NotAuthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_not_found_names_operation() {
        let err = ProgrammerError::HandleNotFound {
            id: "42".into(),
            op: "start_updates",
        };
        assert_eq!(err.as_label(), "handle_not_found");
        assert_eq!(err.session(), "42");
        assert!(err.to_string().contains("start_updates"));
        assert_eq!(err.as_message(), "handle not found: id=42 op=start_updates");
    }

    #[test]
    fn sensor_error_labels() {
        assert_eq!(SensorError::Unavailable.as_label(), "sensor_unavailable");
        assert!(SensorError::NotAuthorized.is_authorization());
        assert!(!SensorError::Unavailable.is_authorization());
        let fault = SensorError::Fault { error: "boom".into() };
        assert_eq!(fault.as_message(), "fault: boom");
    }
}
