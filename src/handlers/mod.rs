//! # Handler abstractions for background work.
//!
//! This module provides the core handler-related types:
//! - [`Handler`] - trait for implementing async cancelable units of work
//! - [`HandlerFn`] - function-based handler implementation
//! - [`HandlerRef`] - shared reference to a handler (`Arc<dyn Handler>`)
//! - [`GrantContext`] - per-grant execution context (deadline + cancel signal)

mod context;
mod handler;
mod handler_fn;

pub use context::GrantContext;
pub use handler::{Handler, HandlerRef};
pub use handler_fn::HandlerFn;
