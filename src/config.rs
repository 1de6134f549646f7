//! Global runtime configuration.
//!
//! Provides [`Config`], the centralized settings for the coordinator.
//!
//! ## Sentinel values
//! - `bus_capacity` is clamped to a minimum of 1 by the bus.

use std::time::Duration;

/// Global configuration for the coordinator runtime.
///
/// ## Field semantics
/// - `grace`: maximum wait for handlers to exit during [`Coordinator::shutdown`](crate::Coordinator::shutdown)
///   after their cancellation signals are raised
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by the bus)
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum time to wait for handlers to stop during shutdown.
    ///
    /// When shutdown is requested:
    /// - Every active grant's cancellation signal is raised
    /// - The coordinator waits up to `grace` for handler tasks to exit
    /// - If exceeded, returns `RuntimeError::GraceExceeded` and detaches the rest
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` messages will
    /// observe `Lagged` and skip older items. Minimum value is 1.
    pub bus_capacity: usize,
}

impl Config {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `grace = 30s` (background windows are short; handlers should exit fast)
    /// - `bus_capacity = 1024` (good baseline)
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(30),
            bus_capacity: 1024,
        }
    }
}
