//! Error types used by the bgbridge runtime and task handlers.
//!
//! This module defines the error taxonomy of the crate:
//!
//! - [`RegistryError`] — setup-time registration failures (fatal to setup).
//! - [`GrantError`] — grant delivery rejections, recovered locally.
//! - [`HandlerError`] — errors raised by individual handler executions.
//! - [`RuntimeError`] — errors raised by the coordinator runtime itself.
//! - [`ScheduleError`] — refusals from the OS scheduler boundary.
//!
//! Setup-time errors are the only ones allowed to abort application startup.
//! Everything else is converted into a completion report and a lifecycle
//! event; no runtime error propagates out of the coordinator.
//!
//! The types provide `as_label()` helpers returning short stable snake_case
//! strings for event reasons and metrics.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced while populating the task registry.
///
/// These indicate configuration bugs and should abort application startup,
/// deterministically, before the OS scheduler is allowed to deliver grants.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The identifier is already bound to a handler.
    #[error("identifier '{id}' is already registered")]
    DuplicateRegistration {
        /// The conflicting task identifier.
        id: String,
    },

    /// The registry was sealed; the setup phase is over.
    #[error("registry is sealed, cannot register '{id}'")]
    Sealed {
        /// The identifier of the rejected registration.
        id: String,
    },
}

impl RegistryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::DuplicateRegistration { .. } => "duplicate_registration",
            RegistryError::Sealed { .. } => "registry_sealed",
        }
    }
}

/// # Grant delivery rejections.
///
/// Produced when the coordinator refuses a grant without invoking any
/// handler. Both cases are recovered locally: the redundant or orphaned
/// grant is failed back to the scheduler and the process continues.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum GrantError {
    /// The granted identifier has no registered handler.
    ///
    /// A normal outcome when the OS holds stale scheduling state from a
    /// previous build of the application.
    #[error("no handler registered for '{id}'")]
    UnregisteredIdentifier {
        /// The unknown task identifier.
        id: String,
    },

    /// A grant for this identifier is already pending.
    ///
    /// Indicates scheduler double-delivery; the existing grant is untouched.
    #[error("a grant for '{id}' is already pending")]
    DuplicateGrant {
        /// The task identifier with an outstanding grant.
        id: String,
    },
}

impl GrantError {
    /// Returns a short stable label (snake_case) for use in event reasons.
    ///
    /// # Example
    /// ```
    /// use bgbridge::GrantError;
    ///
    /// let err = GrantError::DuplicateGrant { id: "refresh".into() };
    /// assert_eq!(err.as_label(), "duplicate_grant");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            GrantError::UnregisteredIdentifier { .. } => "unregistered_identifier",
            GrantError::DuplicateGrant { .. } => "duplicate_grant",
        }
    }
}

/// # Errors produced by handler execution.
///
/// Returned by [`Handler::run`](crate::Handler::run) implementations or
/// synthesized by the coordinator at the invocation boundary. A handler
/// error never escapes the coordinator; it becomes a failure report to the
/// scheduler plus a `Failed` lifecycle event.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Handler execution failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Handler panicked; caught at the invocation boundary.
    #[error("handler panicked: {info}")]
    Panic {
        /// The panic payload, if it was a string.
        info: String,
    },

    /// Handler observed the cancellation signal and exited early.
    #[error("cancelled before completion")]
    Canceled,
}

impl HandlerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Fail { .. } => "handler_failed",
            HandlerError::Panic { .. } => "handler_panic",
            HandlerError::Canceled => "handler_canceled",
        }
    }

    /// True when the error is a cooperative cancellation exit.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, HandlerError::Canceled)
    }
}

/// # Errors produced by the coordinator runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some handlers ignored the
    /// cancellation signal and were left detached.
    #[error("shutdown grace {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Identifiers whose handlers did not finish in time.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}

/// # Refusals from the OS scheduler boundary.
///
/// Returned by [`SchedulerPort::request_execution`](crate::SchedulerPort::request_execution).
/// Note that the absence of a later grant is a normal outcome, not an error;
/// these cover only the request itself being refused.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// The scheduler rejected the request (unknown identifier, bad window).
    #[error("scheduler rejected request: {reason}")]
    Rejected {
        /// Scheduler-provided refusal reason.
        reason: String,
    },

    /// Background execution is unavailable for this process.
    #[error("background execution unavailable")]
    Unavailable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        let dup = RegistryError::DuplicateRegistration { id: "x".into() };
        assert_eq!(dup.as_label(), "duplicate_registration");

        let unreg = GrantError::UnregisteredIdentifier { id: "x".into() };
        assert_eq!(unreg.as_label(), "unregistered_identifier");

        let panic = HandlerError::Panic { info: "boom".into() };
        assert_eq!(panic.as_label(), "handler_panic");
        assert!(!panic.is_cancellation());
        assert!(HandlerError::Canceled.is_cancellation());
    }

    #[test]
    fn messages_carry_identifiers() {
        let err = GrantError::DuplicateGrant { id: "refresh".into() };
        assert!(err.to_string().contains("refresh"));

        let err = RegistryError::Sealed { id: "sync".into() };
        assert!(err.to_string().contains("sync"));
    }
}
