//! # Manager configuration.
//!
//! Provides [`Config`], centralized settings for a
//! [`SensorStreamManager`](crate::SensorStreamManager).
//!
//! ## Sentinel values
//! - `stream_capacity = 0` → unbounded bridging channel (no sample is ever dropped)
//! - `bus_capacity = 0` → clamped to 1 by the bus

/// Settings for a sensor stream manager.
///
/// ## Field semantics
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
/// - `stream_capacity`: per-stream sample buffer (`0` = unbounded)
/// - `stop_on_destroy`: `destroy` stops an active stream before releasing the handle
/// - `panic_on_misuse`: diagnostics panic after being published
///
/// ## Notes
/// All fields are public. Prefer the helper accessors over sentinel checks.
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers that lag behind more than `bus_capacity` events observe
    /// `Lagged` and skip older items.
    pub bus_capacity: usize,

    /// Number of samples buffered between the provider and a slow consumer.
    ///
    /// - `0` = unbounded
    /// - `n > 0` = at most `n` samples; newer samples are dropped (and
    ///   reported as `SampleDropped`) while the buffer is full. A terminal
    ///   error is always delivered.
    pub stream_capacity: usize,

    /// Whether `destroy` cancels an active stream of the same identifier.
    ///
    /// With `false` the stream keeps its own reference to the released
    /// handle and runs until it is dropped or fails.
    pub stop_on_destroy: bool,

    /// Whether programmer errors panic after being reported.
    ///
    /// Meant for debug builds and tests that want misuse to be loud.
    pub panic_on_misuse: bool,
}

impl Config {
    /// Returns the per-stream buffer size as an `Option`.
    ///
    /// - `None` → unbounded
    /// - `Some(n)` → bounded to `n` samples
    #[inline]
    pub fn stream_limit(&self) -> Option<usize> {
        if self.stream_capacity == 0 {
            None
        } else {
            Some(self.stream_capacity)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `stream_capacity = 0` (unbounded)
    /// - `stop_on_destroy = true`
    /// - `panic_on_misuse = false`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            stream_capacity: 0,
            stop_on_destroy: true,
            panic_on_misuse: false,
        }
    }
}
