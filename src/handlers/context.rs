//! # Per-grant execution context.
//!
//! [`GrantContext`] is what a handler receives for one execution window. It
//! exposes the deadline by which completion must be reported and the
//! cooperative cancellation signal the OS (or the deadline watchdog) may
//! raise before that.
//!
//! A handler should check [`GrantContext::is_cancelled`] at natural
//! checkpoints, or race long waits against [`GrantContext::cancelled`], and
//! exit promptly once the signal is raised. Ignoring the signal is
//! tolerated; the grant is then expired on the handler's behalf and its
//! late result is discarded.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Execution context handed to a [`Handler`](crate::Handler) for one grant.
///
/// Cheap to clone; clones observe the same cancellation signal.
///
/// # Example
/// ```rust
/// # use bgbridge::GrantContext;
/// # async fn demo(ctx: GrantContext) {
/// while !ctx.is_cancelled() {
///     if ctx.remaining() < std::time::Duration::from_millis(500) {
///         break; // wrap up before the window closes
///     }
///     // one bounded unit of work...
/// }
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct GrantContext {
    deadline: Instant,
    cancel: CancellationToken,
}

impl GrantContext {
    pub(crate) fn new(deadline: Instant, cancel: CancellationToken) -> Self {
        Self { deadline, cancel }
    }

    /// Absolute point in time by which completion must be reported.
    #[inline]
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time remaining until the deadline (zero once it has passed).
    #[inline]
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// True once early termination has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Completes when early termination is requested.
    ///
    /// Useful to race against long-running work:
    /// `tokio::select! { _ = ctx.cancelled() => ..., res = work => ... }`
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }
}
