//! Lifecycle events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to lifecycle events emitted by the coordinator, the
//! grant watchdogs and the handler completion paths.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Coordinator::on_grant`, the per-grant watchdog and
//!   completion paths.
//! - **Consumers**: the coordinator's subscriber listener (fans out to
//!   `SubscriberSet`) and any ad-hoc `Coordinator::subscribe()` receiver.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
