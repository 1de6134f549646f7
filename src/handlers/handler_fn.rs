//! # Function-backed handler (`HandlerFn`)
//!
//! [`HandlerFn`] wraps a closure `F: Fn(GrantContext) -> Fut`, producing a
//! fresh future per grant. This avoids shared mutable state between
//! executions; if shared state is needed, move an `Arc<...>` into the
//! closure explicitly.
//!
//! ## Example
//! ```rust
//! use bgbridge::{GrantContext, HandlerError, HandlerFn, HandlerRef};
//!
//! let h: HandlerRef = HandlerFn::arc(|ctx: GrantContext| async move {
//!     if ctx.is_cancelled() {
//!         return Err(HandlerError::Canceled);
//!     }
//!     // do work...
//!     Ok(())
//! });
//! # let _ = h;
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::handlers::context::GrantContext;
use crate::handlers::handler::Handler;

/// Function-backed handler implementation.
///
/// Wraps a closure that *creates* a new future per grant.
#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

impl<F> HandlerFn<F> {
    /// Creates a new function-backed handler.
    ///
    /// Prefer [`HandlerFn::arc`] when you immediately need a [`HandlerRef`](crate::HandlerRef).
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(GrantContext) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn run(&self, ctx: GrantContext) -> Result<(), HandlerError> {
        (self.f)(ctx).await
    }
}
