//! # Event subscribers: the application-facing sink.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`]
//! fan-out used to deliver lifecycle events to application listeners.
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Coordinator ── publish(Event) ──► Bus ──► subscriber listener
//!                                                  │
//!                                           SubscriberSet::emit(&Event)
//!                                        ┌─────────┼─────────┐
//!                                        ▼         ▼         ▼
//!                                   [queue S1] [queue S2] [queue SN]
//!                                        │         │         │
//!                                   worker S1  worker S2  worker SN
//!                                        ▼         ▼         ▼
//!                                  sub.on_event(&Event)  (per subscriber)
//! ```
//!
//! Delivery is fire-and-forget: a listener that panics or falls behind
//! never affects other listeners or coordinator state.

mod set;
mod subscribe;

#[cfg(feature = "logging")]
mod log;

pub use set::SubscriberSet;
pub use subscribe::Subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
