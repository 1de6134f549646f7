//! # Grant identity and completion state.
//!
//! A [`Grant`] is one OS-issued opportunity to execute a background task
//! before a deadline. Internally the coordinator tracks it as a
//! [`GrantState`] whose completion state lives in an `AtomicU8`:
//!
//! ```text
//! Pending ──claim──► Completed   (handler returned Ok)
//!         ──claim──► Failed      (handler returned Err or panicked)
//!         ──claim──► Expired     (watchdog fired / cancel raised first)
//! ```
//!
//! The transition out of `Pending` is claimed with a single
//! compare-and-swap; the handler completion path and the deadline watchdog
//! race for it, exactly one wins, and the loser observes the terminal state
//! and becomes a no-op. This is what keeps the scheduler's exactly-once
//! completion report intact under any timing.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Opaque per-grant token issued by the OS scheduler.
///
/// Carried through the coordinator untouched and handed back in the
/// completion report, so the scheduler can match the report to the grant
/// it issued.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GrantHandle(u64);

impl GrantHandle {
    /// Wraps a raw scheduler-issued token.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw token value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// One OS-issued execution opportunity for a registered task.
///
/// Constructed by the scheduler glue when the OS delivers a callback and
/// handed to [`Coordinator::on_grant`](crate::Coordinator::on_grant). The
/// OS side keeps a clone of `cancel` and may raise it before the deadline
/// to request an early stop.
#[derive(Debug)]
pub struct Grant {
    pub(crate) handle: GrantHandle,
    pub(crate) task_id: Arc<str>,
    pub(crate) deadline: Instant,
    pub(crate) cancel: CancellationToken,
}

impl Grant {
    /// Creates a grant for `task_id` that must complete before `deadline`.
    pub fn new(
        handle: GrantHandle,
        task_id: impl Into<Arc<str>>,
        deadline: Instant,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            handle,
            task_id: task_id.into(),
            deadline,
            cancel,
        }
    }

    /// The scheduler-issued completion token.
    pub fn handle(&self) -> GrantHandle {
        self.handle
    }

    /// The granted task identifier.
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Absolute point in time by which completion must be reported.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

/// Completion state of a tracked grant. Exactly one terminal state is
/// ever reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum CompletionState {
    Pending = 0,
    Completed = 1,
    Failed = 2,
    Expired = 3,
}

fn decode(raw: u8) -> CompletionState {
    match raw {
        0 => CompletionState::Pending,
        1 => CompletionState::Completed,
        2 => CompletionState::Failed,
        _ => CompletionState::Expired,
    }
}

/// Shared, atomically-updated record of one tracked grant.
pub(crate) struct GrantState {
    pub(crate) handle: GrantHandle,
    pub(crate) task_id: Arc<str>,
    pub(crate) deadline: Instant,
    pub(crate) cancel: CancellationToken,
    state: AtomicU8,
}

impl GrantState {
    pub(crate) fn new(grant: Grant) -> Arc<Self> {
        Arc::new(Self {
            handle: grant.handle,
            task_id: grant.task_id,
            deadline: grant.deadline,
            cancel: grant.cancel,
            state: AtomicU8::new(CompletionState::Pending as u8),
        })
    }

    /// Attempts to move the grant out of `Pending` into `next`.
    ///
    /// Returns `true` for exactly one caller; every later attempt observes
    /// the terminal state and gets `false`.
    pub(crate) fn claim(&self, next: CompletionState) -> bool {
        debug_assert!(next != CompletionState::Pending);
        self.state
            .compare_exchange(
                CompletionState::Pending as u8,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub(crate) fn state(&self) -> CompletionState {
        decode(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.state() == CompletionState::Pending
    }
}

/// Entry in the coordinator's active-grant table.
pub(crate) struct ActiveEntry {
    pub(crate) grant: Arc<GrantState>,
    /// Join handle of the handler task; awaited during shutdown.
    pub(crate) join: JoinHandle<()>,
}

/// Shared table of grants that have not reached a terminal state yet.
///
/// Locked only for insert/remove/snapshot; never held across handler
/// execution.
pub(crate) type ActiveTable = Arc<RwLock<HashMap<Arc<str>, ActiveEntry>>>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn state() -> Arc<GrantState> {
        GrantState::new(Grant::new(
            GrantHandle::new(7),
            "refresh",
            Instant::now() + Duration::from_secs(1),
            CancellationToken::new(),
        ))
    }

    #[tokio::test]
    async fn claim_wins_exactly_once() {
        let g = state();
        assert!(g.is_pending());

        assert!(g.claim(CompletionState::Completed));
        assert!(!g.claim(CompletionState::Expired));
        assert!(!g.claim(CompletionState::Failed));
        assert_eq!(g.state(), CompletionState::Completed);
    }

    #[tokio::test]
    async fn concurrent_claims_have_a_single_winner() {
        let g = state();
        let mut wins = 0;
        let mut tasks = Vec::new();
        for next in [
            CompletionState::Completed,
            CompletionState::Failed,
            CompletionState::Expired,
        ] {
            let g = Arc::clone(&g);
            tasks.push(tokio::spawn(async move { g.claim(next) }));
        }
        for t in tasks {
            if t.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
        assert!(!g.is_pending());
    }

    #[test]
    fn handle_round_trips_raw_value() {
        let h = GrantHandle::new(42);
        assert_eq!(h.raw(), 42);
        assert_eq!(h, GrantHandle::new(42));
    }
}
