//! Value types forwarded verbatim from the sensor provider.

use std::time::Duration;

/// One relative-altitude reading.
///
/// The manager never inspects the values; they are produced by the provider
/// and handed to the consumer unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativeAltitudeSample {
    /// Time the reading was taken, measured from device boot.
    pub timestamp: Duration,
    /// Change in altitude since updates began, in meters.
    pub relative_altitude: f64,
    /// Recorded air pressure, in kilopascals.
    pub pressure: f64,
}

impl RelativeAltitudeSample {
    /// Creates a sample from its raw parts.
    pub fn new(timestamp: Duration, relative_altitude: f64, pressure: f64) -> Self {
        Self {
            timestamp,
            relative_altitude,
            pressure,
        }
    }
}

/// Permission state for reading the altimeter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthorizationStatus {
    /// The user has not been asked yet.
    #[default]
    NotDetermined,
    /// Access is blocked by policy and cannot be granted by the user.
    Restricted,
    /// The user declined access.
    Denied,
    /// Access granted.
    Authorized,
}

impl AuthorizationStatus {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            AuthorizationStatus::NotDetermined => "not_determined",
            AuthorizationStatus::Restricted => "restricted",
            AuthorizationStatus::Denied => "denied",
            AuthorizationStatus::Authorized => "authorized",
        }
    }

    #[inline]
    pub fn is_authorized(&self) -> bool {
        matches!(self, AuthorizationStatus::Authorized)
    }
}
