//! # OS scheduler boundary.
//!
//! The coordinator never talks to a concrete OS API; it depends on the
//! narrow [`SchedulerPort`] trait. Production code implements it over the
//! platform's background-task scheduler, tests implement it with a
//! recording fake.
//!
//! Two directions cross this boundary:
//! - outbound requests for future execution windows ([`ExecutionRequest`]),
//!   issued by application setup code;
//! - outbound completion reports, issued by the coordinator **exactly once
//!   per grant handle**. A second report for the same handle is undefined
//!   behavior in the external scheduler, which is why the coordinator
//!   guards the transition with an atomic claim.
//!
//! The inbound direction (the scheduler delivering a grant) is
//! [`Coordinator::on_grant`](crate::Coordinator::on_grant).

use std::time::SystemTime;

use crate::core::GrantHandle;
use crate::error::ScheduleError;

/// Narrow interface to the OS background-task scheduler.
///
/// Implementations must be cheap and non-blocking: `report_completion` is
/// called from grant completion paths and must not stall them.
pub trait SchedulerPort: Send + Sync + 'static {
    /// Asks the OS to grant a future execution window.
    ///
    /// A successful request does not guarantee a grant will ever arrive;
    /// the OS decides if and when the task runs.
    fn request_execution(&self, request: &ExecutionRequest) -> Result<(), ScheduleError>;

    /// Acknowledges a grant's outcome to the OS.
    ///
    /// Called exactly once per grant handle by the coordinator.
    fn report_completion(&self, handle: GrantHandle, success: bool);
}

/// Parameters for requesting a future execution window.
///
/// Identifiers are opaque strings agreed upon out-of-band between the
/// application and the OS configuration.
///
/// # Example
/// ```rust
/// use std::time::{Duration, SystemTime};
/// use bgbridge::ExecutionRequest;
///
/// let req = ExecutionRequest::new("refresh")
///     .with_earliest(SystemTime::now() + Duration::from_secs(15 * 60))
///     .with_connectivity(true);
/// assert_eq!(req.identifier, "refresh");
/// assert!(req.requires_connectivity);
/// assert!(!req.requires_charging);
/// ```
#[derive(Clone, Debug)]
pub struct ExecutionRequest {
    /// Task identifier the grant should be issued for.
    pub identifier: String,
    /// Earliest point in time the OS may grant execution; `None` = any time.
    pub earliest: Option<SystemTime>,
    /// Only run while the device has network connectivity.
    pub requires_connectivity: bool,
    /// Only run while the device is charging.
    pub requires_charging: bool,
}

impl ExecutionRequest {
    /// Creates a request with no constraints.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            earliest: None,
            requires_connectivity: false,
            requires_charging: false,
        }
    }

    /// Sets the earliest start time.
    pub fn with_earliest(mut self, earliest: SystemTime) -> Self {
        self.earliest = Some(earliest);
        self
    }

    /// Requires network connectivity.
    pub fn with_connectivity(mut self, required: bool) -> Self {
        self.requires_connectivity = required;
        self
    }

    /// Requires external power.
    pub fn with_charging(mut self, required: bool) -> Self {
        self.requires_charging = required;
        self
    }
}
