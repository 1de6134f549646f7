//! # Handler trait: the application-supplied unit of background work.
//!
//! A `Handler` is bound to a task identifier in the
//! [`TaskRegistry`](crate::TaskRegistry) and invoked by the coordinator
//! whenever the OS grants execution time for that identifier. It receives a
//! [`GrantContext`] and should finish, or exit on cancellation, before the
//! context's deadline.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::handlers::context::GrantContext;

/// Shared handle to a handler, suitable for storing in the registry.
pub type HandlerRef = Arc<dyn Handler>;

/// # Asynchronous, cancelable unit of background work.
///
/// Implementors should regularly check the context's cancellation signal
/// and exit promptly when it is raised; cancellation is cooperative only.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use bgbridge::{GrantContext, Handler, HandlerError};
///
/// struct Refresh;
///
/// #[async_trait]
/// impl Handler for Refresh {
///     async fn run(&self, ctx: GrantContext) -> Result<(), HandlerError> {
///         if ctx.is_cancelled() {
///             return Err(HandlerError::Canceled);
///         }
///         // do bounded work...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Executes one grant's worth of work.
    ///
    /// Returning `Ok(())` reports the grant as completed successfully;
    /// any error reports it as failed. Panics are caught at the invocation
    /// boundary and converted into [`HandlerError::Panic`].
    async fn run(&self, ctx: GrantContext) -> Result<(), HandlerError>;
}
