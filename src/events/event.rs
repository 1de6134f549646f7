//! # Lifecycle events emitted by the coordinator.
//!
//! The [`EventKind`] enum classifies the four observable stages of a grant:
//! `Started`, `Completed`, `Expired` and `Failed`. The [`Event`] struct
//! carries additional metadata such as the timestamp, task identifier,
//! failure reason and remaining time budget.
//!
//! Events are the only observability channel of the runtime path: every
//! recovered error surfaces as a `Failed` or `Expired` event, never as a
//! propagated error.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically in emission order. Listeners fed from one bus receiver
//! observe events in that order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use bgbridge::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::Failed)
//!     .with_task("refresh")
//!     .with_reason("boom");
//!
//! assert_eq!(ev.kind, EventKind::Failed);
//! assert_eq!(ev.task.as_deref(), Some("refresh"));
//! assert_eq!(ev.reason.as_deref(), Some("boom"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of grant lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A grant was accepted and its handler is about to run.
    ///
    /// Sets:
    /// - `task`: task identifier
    /// - `budget_ms`: time remaining until the deadline
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    Started,

    /// The handler finished successfully before the deadline.
    ///
    /// Sets:
    /// - `task`: task identifier
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    Completed,

    /// The deadline watchdog fired (or the OS raised the cancel signal)
    /// before the handler finished. Cooperative cancellation was requested.
    ///
    /// Sets:
    /// - `task`: task identifier
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    Expired,

    /// The grant resolved to a failure: the handler returned an error or
    /// panicked, the identifier was unregistered, or the grant was a
    /// duplicate delivery.
    ///
    /// Sets:
    /// - `task`: task identifier
    /// - `reason`: failure message
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    Failed,
}

/// Lifecycle event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Task identifier, if applicable.
    pub task: Option<Arc<str>>,
    /// Human-readable failure reason.
    pub reason: Option<Arc<str>>,
    /// Time remaining until the deadline at emission, in milliseconds.
    pub budget_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and
    /// next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            reason: None,
            budget_ms: None,
        }
    }

    /// Attaches a task identifier.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a human-readable failure reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches the remaining deadline budget (stored as milliseconds).
    #[inline]
    pub fn with_budget(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.budget_ms = Some(ms);
        self
    }

    /// True for terminal kinds (everything except `Started`).
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self.kind, EventKind::Started)
    }
}
