//! # Per-grant execution paths.
//!
//! Two tasks are spawned for every accepted grant and race for the single
//! transition out of `Pending`:
//!
//! - [`drive_handler`] executes the handler (panics caught at the
//!   boundary) and settles the grant with its result;
//! - [`drive_watchdog`] sleeps until the deadline, or wakes immediately if
//!   the cancel signal is raised early, and settles the grant as expired.
//!
//! ## Event flow
//! ```text
//! Handler wins the claim:
//!   run() → Ok(())  → report(success=true)  → publish Completed
//!   run() → Err(e)  → report(success=false) → publish Failed
//!   run() panicked  → report(success=false) → publish Failed
//!
//! Watchdog wins the claim:
//!   deadline/cancel → raise cancel → report(success=false) → publish Expired
//!   (a handler finishing afterwards only bumps the late-completion counter)
//! ```
//!
//! ## Rules
//! - The scheduler report is issued by the claim winner only, so exactly
//!   once per grant handle.
//! - The grant's table entry is removed by the winner before reporting;
//!   by the time the scheduler learns the outcome, a new grant for the
//!   same identifier is accepted again.
//! - Removal compares `Arc` identity, so a watchdog can never evict a
//!   newer grant that reused the identifier.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use tokio::time;

use crate::core::grant::{ActiveTable, CompletionState, GrantState};
use crate::error::HandlerError;
use crate::events::{Bus, Event, EventKind};
use crate::handlers::{GrantContext, HandlerRef};
use crate::scheduler::SchedulerPort;

/// Runs the handler for one grant and settles the outcome if still pending.
pub(crate) async fn drive_handler(
    grant: Arc<GrantState>,
    handler: HandlerRef,
    active: ActiveTable,
    scheduler: Arc<dyn SchedulerPort>,
    bus: Bus,
    late: Arc<AtomicU64>,
) {
    let ctx = GrantContext::new(grant.deadline, grant.cancel.clone());
    let res = execute(handler, ctx).await;

    let next = match &res {
        Ok(()) => CompletionState::Completed,
        Err(_) => CompletionState::Failed,
    };
    if !grant.claim(next) {
        // The watchdog already resolved this grant. The late result stays
        // observable through the diagnostic counter only; a second
        // scheduler report would be undefined behavior on the OS side.
        late.fetch_add(1, Ordering::Relaxed);
        return;
    }

    remove_active(&active, &grant).await;
    scheduler.report_completion(grant.handle, res.is_ok());
    match res {
        Ok(()) => {
            bus.publish(Event::new(EventKind::Completed).with_task(grant.task_id.clone()));
        }
        Err(e) => {
            bus.publish(
                Event::new(EventKind::Failed)
                    .with_task(grant.task_id.clone())
                    .with_reason(e.to_string()),
            );
        }
    }
}

/// Expires the grant when the deadline passes or the cancel signal is
/// raised early, unless the handler settled it first.
pub(crate) async fn drive_watchdog(
    grant: Arc<GrantState>,
    active: ActiveTable,
    scheduler: Arc<dyn SchedulerPort>,
    bus: Bus,
) {
    tokio::select! {
        _ = time::sleep_until(grant.deadline) => {}
        _ = grant.cancel.cancelled() => {}
    }

    if !grant.claim(CompletionState::Expired) {
        return;
    }

    // Cooperative stop request; the handler is signaled, never killed.
    grant.cancel.cancel();
    remove_active(&active, &grant).await;
    scheduler.report_completion(grant.handle, false);
    bus.publish(Event::new(EventKind::Expired).with_task(grant.task_id.clone()));
}

/// Executes the handler with panics contained at the boundary.
async fn execute(handler: HandlerRef, ctx: GrantContext) -> Result<(), HandlerError> {
    match AssertUnwindSafe(handler.run(ctx)).catch_unwind().await {
        Ok(res) => res,
        Err(payload) => Err(HandlerError::Panic {
            info: panic_info(payload),
        }),
    }
}

fn panic_info(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Removes the grant's entry, but only if the table still holds this exact
/// grant.
async fn remove_active(active: &ActiveTable, grant: &Arc<GrantState>) {
    let mut table = active.write().await;
    if let Some(entry) = table.get(grant.task_id.as_ref()) {
        if Arc::ptr_eq(&entry.grant, grant) {
            table.remove(grant.task_id.as_ref());
        }
    }
}
