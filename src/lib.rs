//! # bgbridge
//!
//! **bgbridge** is a bridge between an operating system's background-task
//! scheduler and an application's event-driven logic layer.
//!
//! Application code registers interest in named background task types, the
//! OS grants execution windows for them at its own discretion, and the
//! coordinator runs the matching handler, enforces the "signal completion
//! before the deadline" contract, and multiplexes every grant's lifecycle
//! into an observable event stream.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   Handler    │   │   Handler    │   │   Handler    │
//!     │  ("refresh") │   │   ("sync")   │   │  ("upload")  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  TaskRegistry (identifier → handler, sealed after setup)          │
//! └───────────────────────────────┬───────────────────────────────────┘
//!                                 │ lookup
//! OS scheduler ── on_grant ──► Coordinator
//!                                 │
//!                ┌────────────────┼────────────────┐
//!                ▼                ▼                ▼
//!          drive_handler    drive_watchdog    duplicate /
//!          (handler task)   (deadline +       unregistered
//!                │           early cancel)    rejection
//!                └───── CAS: Pending → terminal ──┘
//!                                 │
//!            SchedulerPort::report_completion (exactly once)
//!                                 │
//!                                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                     Bus (broadcast channel)                       │
//! └───────────────┬─────────────────────────────────┬─────────────────┘
//!                 ▼                                 ▼
//!        subscriber listener              Coordinator::subscribe()
//!                 │                         (ad-hoc receivers)
//!           SubscriberSet
//!         ┌───────┼───────┐
//!         ▼       ▼       ▼
//!       sub1    sub2    subN     (bounded queues, panic isolation)
//! ```
//!
//! ### Grant lifecycle
//! ```text
//! on_grant(grant)
//!   ├─► pending grant for the same id? ─► fail the new handle only
//!   ├─► no registered handler?         ─► fail, publish Failed
//!   └─► accept:
//!        ├─► publish Started { budget }
//!        ├─► handler task: run(ctx) → Ok/Err/panic
//!        └─► watchdog: sleep_until(deadline) | cancel raised early
//!
//! exactly one of them claims the terminal transition:
//!   handler  ─► Completed / Failed  ─► report(success) ─► event
//!   watchdog ─► Expired             ─► raise cancel ─► report(false) ─► event
//!
//! the loser observes the terminal state and becomes a no-op
//! (a late handler result only bumps a diagnostic counter)
//! ```
//!
//! ## Features
//! | Area               | Description                                                       | Key types / traits                  |
//! |--------------------|-------------------------------------------------------------------|-------------------------------------|
//! | **Registry**       | Declare interest in task identifiers before the OS may call back. | [`TaskRegistry`]                    |
//! | **Coordination**   | Deadline + cancellation enforcement, exactly-once reporting.      | [`Coordinator`], [`Grant`]          |
//! | **Handlers**       | Define units of background work as traits or closures.            | [`Handler`], [`HandlerFn`]          |
//! | **Subscriber API** | Observe grant lifecycles (logging, metrics, custom subscribers).  | [`Subscribe`], [`SubscriberSet`]    |
//! | **Scheduler port** | Narrow boundary to the OS scheduler, fakeable in tests.           | [`SchedulerPort`], [`ExecutionRequest`] |
//! | **Errors**         | Typed errors for setup, grants, handlers and the runtime.         | [`RegistryError`], [`HandlerError`] |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio::time::Instant;
//! use tokio_util::sync::CancellationToken;
//! use bgbridge::{
//!     Config, Coordinator, ExecutionRequest, Grant, GrantContext, GrantHandle,
//!     HandlerError, HandlerFn, ScheduleError, SchedulerPort, TaskRegistry,
//! };
//!
//! // Production code implements this over the platform scheduler.
//! struct NoopScheduler;
//!
//! impl SchedulerPort for NoopScheduler {
//!     fn request_execution(&self, _req: &ExecutionRequest) -> Result<(), ScheduleError> {
//!         Ok(())
//!     }
//!     fn report_completion(&self, handle: GrantHandle, success: bool) {
//!         println!("grant {} done: success={success}", handle.raw());
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Setup phase: bind identifiers, then seal.
//!     let registry = Arc::new(TaskRegistry::new());
//!     registry
//!         .register("refresh", HandlerFn::arc(|ctx: GrantContext| async move {
//!             if ctx.is_cancelled() {
//!                 return Err(HandlerError::Canceled);
//!             }
//!             // do bounded work within ctx.remaining()...
//!             Ok(())
//!         }))
//!         .await?;
//!     registry.seal();
//!
//!     let coordinator = Coordinator::builder(Config::default())
//!         .build(registry, Arc::new(NoopScheduler));
//!
//!     // The OS glue delivers grants; here we hand one over manually.
//!     let grant = Grant::new(
//!         GrantHandle::new(1),
//!         "refresh",
//!         Instant::now() + Duration::from_secs(25),
//!         CancellationToken::new(),
//!     );
//!     coordinator.on_grant(grant).await;
//!
//!     coordinator.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod handlers;
mod registry;
mod scheduler;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{Coordinator, CoordinatorBuilder, Grant, GrantHandle};
pub use config::Config;
pub use error::{GrantError, HandlerError, RegistryError, RuntimeError, ScheduleError};
pub use events::{Bus, Event, EventKind};
pub use handlers::{GrantContext, Handler, HandlerFn, HandlerRef};
pub use registry::TaskRegistry;
pub use scheduler::{ExecutionRequest, SchedulerPort};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
