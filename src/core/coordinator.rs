//! # Coordinator: the background task lifecycle coordinator.
//!
//! The [`Coordinator`] sits between the OS scheduler and the application:
//! it accepts OS-delivered grants, looks up the matching handler in the
//! [`TaskRegistry`], enforces the "signal completion before the deadline"
//! contract, and multiplexes grant lifecycles into the event bus.
//!
//! ## High-level architecture
//! ```text
//! OS scheduler ──► Coordinator::on_grant(Grant)
//!                    ├─ duplicate-Pending guard ─► report failure (new handle only)
//!                    ├─ registry lookup miss    ─► report failure, publish Failed
//!                    └─ accept:
//!                         ├─ publish Started
//!                         ├─ spawn drive_handler(grant)   (independent task)
//!                         └─ spawn drive_watchdog(grant)  (independent task)
//!
//! Either path claims the terminal transition (CAS) and then, exactly once:
//!   SchedulerPort::report_completion(handle, success) + Bus::publish(event)
//!
//! Bus ──► subscriber listener ──► SubscriberSet ──► application listeners
//! ```
//!
//! ## Rules
//! - `on_grant` does bounded work only (short lock, registry read, two
//!   spawns); handler execution never runs on the delivery path.
//! - At most one Pending grant per identifier; a second delivery is failed
//!   immediately while the original proceeds untouched.
//! - No runtime error escapes: handler errors and panics become `Failed`
//!   outcomes, stale identifiers become `Failed` outcomes, deadline misses
//!   become `Expired` outcomes.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{RwLock, broadcast};
use tokio::time::Instant;

use crate::config::Config;
use crate::core::builder::CoordinatorBuilder;
use crate::core::grant::{ActiveEntry, ActiveTable, Grant, GrantState};
use crate::core::runner;
use crate::error::{GrantError, RuntimeError};
use crate::events::{Bus, Event, EventKind};
use crate::registry::TaskRegistry;
use crate::scheduler::SchedulerPort;
use crate::subscribers::SubscriberSet;

/// Coordinates grant execution, deadline enforcement, exactly-once
/// completion reporting and event delivery.
pub struct Coordinator {
    cfg: Config,
    registry: Arc<TaskRegistry>,
    scheduler: Arc<dyn SchedulerPort>,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    active: ActiveTable,
    late: Arc<AtomicU64>,
}

impl Coordinator {
    /// Starts building a coordinator with the given configuration.
    pub fn builder(cfg: Config) -> CoordinatorBuilder {
        CoordinatorBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        registry: Arc<TaskRegistry>,
        scheduler: Arc<dyn SchedulerPort>,
        bus: Bus,
        subs: Arc<SubscriberSet>,
    ) -> Self {
        Self {
            cfg,
            registry,
            scheduler,
            bus,
            subs,
            active: Arc::new(RwLock::new(HashMap::new())),
            late: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Entry point invoked by the OS scheduler when it grants execution
    /// time for `grant.task_id()`.
    ///
    /// Returns promptly; the handler runs on an independent task. Every
    /// outcome, including rejections, surfaces as exactly one completion
    /// report for the grant's handle plus a lifecycle event.
    pub async fn on_grant(&self, grant: Grant) {
        let mut table = self.active.write().await;

        // Defensive guard against scheduler double-delivery: the original
        // grant is untouched, only the new handle is failed.
        if let Some(existing) = table.get(grant.task_id.as_ref()) {
            if existing.grant.is_pending() {
                drop(table);
                let err = GrantError::DuplicateGrant {
                    id: grant.task_id.to_string(),
                };
                self.reject(&grant, &err);
                return;
            }
        }

        let Some(handler) = self.registry.lookup(&grant.task_id).await else {
            drop(table);
            let err = GrantError::UnregisteredIdentifier {
                id: grant.task_id.to_string(),
            };
            self.reject(&grant, &err);
            return;
        };

        let state = GrantState::new(grant);
        let budget = state.deadline.saturating_duration_since(Instant::now());
        self.bus.publish(
            Event::new(EventKind::Started)
                .with_task(state.task_id.clone())
                .with_budget(budget),
        );

        let join = tokio::spawn(runner::drive_handler(
            Arc::clone(&state),
            handler,
            Arc::clone(&self.active),
            Arc::clone(&self.scheduler),
            self.bus.clone(),
            Arc::clone(&self.late),
        ));
        tokio::spawn(runner::drive_watchdog(
            Arc::clone(&state),
            Arc::clone(&self.active),
            Arc::clone(&self.scheduler),
            self.bus.clone(),
        ));

        table.insert(state.task_id.clone(), ActiveEntry { grant: state, join });
    }

    /// Fails a grant without invoking any handler.
    fn reject(&self, grant: &Grant, err: &GrantError) {
        self.scheduler.report_completion(grant.handle, false);
        self.bus.publish(
            Event::new(EventKind::Failed)
                .with_task(grant.task_id.clone())
                .with_reason(err.to_string()),
        );
    }

    /// Stops background activity: raises every active grant's cancel
    /// signal and waits up to [`Config::grace`] for handler tasks to exit.
    ///
    /// Each cancelled grant is expired by its watchdog and still reports
    /// to the scheduler exactly once. Handlers that ignore the signal past
    /// the grace period are left detached and listed in the error.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let entries: Vec<(Arc<str>, ActiveEntry)> = {
            let mut table = self.active.write().await;
            table.drain().collect()
        };

        for (_, entry) in &entries {
            entry.grant.cancel.cancel();
        }

        let deadline = Instant::now() + self.cfg.grace;
        let mut stuck = Vec::new();
        for (id, entry) in entries {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if tokio::time::timeout(remaining, entry.join).await.is_err() {
                stuck.push(id.to_string());
            }
        }

        if stuck.is_empty() {
            Ok(())
        } else {
            Err(RuntimeError::GraceExceeded {
                grace: self.cfg.grace,
                stuck,
            })
        }
    }

    /// Creates a receiver observing subsequent lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Returns a sorted snapshot of identifiers with an in-flight grant.
    pub async fn active(&self) -> Vec<String> {
        let table = self.active.read().await;
        let mut ids: Vec<String> = table.keys().map(|k| k.to_string()).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of handler results that arrived after their grant had
    /// already expired. Diagnostic only; late results are never reported
    /// to the scheduler.
    pub fn late_completions(&self) -> u64 {
        self.late.load(Ordering::Relaxed)
    }

    /// Number of attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subs.len()
    }

    /// Subscribes to the bus and forwards events to the subscriber set.
    pub(crate) fn spawn_subscriber_listener(&self) {
        let mut rx = self.bus.subscribe();
        let subs = Arc::clone(&self.subs);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => subs.emit(&ev),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grant::GrantHandle;
    use crate::error::{HandlerError, ScheduleError};
    use crate::handlers::{GrantContext, HandlerFn};
    use crate::scheduler::ExecutionRequest;

    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    use tokio::time;
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct RecordingScheduler {
        reports: StdMutex<Vec<(GrantHandle, bool)>>,
    }

    impl RecordingScheduler {
        fn reports(&self) -> Vec<(GrantHandle, bool)> {
            self.reports.lock().unwrap().clone()
        }
    }

    impl SchedulerPort for RecordingScheduler {
        fn request_execution(&self, _request: &ExecutionRequest) -> Result<(), ScheduleError> {
            Ok(())
        }

        fn report_completion(&self, handle: GrantHandle, success: bool) {
            self.reports.lock().unwrap().push((handle, success));
        }
    }

    async fn build(
        registry: Arc<TaskRegistry>,
    ) -> (
        Arc<Coordinator>,
        Arc<RecordingScheduler>,
        broadcast::Receiver<Event>,
    ) {
        let scheduler = Arc::new(RecordingScheduler::default());
        let coord = Coordinator::builder(Config::default()).build(registry, scheduler.clone());
        let rx = coord.subscribe();
        (coord, scheduler, rx)
    }

    fn grant(handle: u64, id: &str, deadline_in: Duration) -> Grant {
        Grant::new(
            GrantHandle::new(handle),
            id,
            Instant::now() + deadline_in,
            CancellationToken::new(),
        )
    }

    async fn next_event(rx: &mut broadcast::Receiver<Event>) -> Event {
        rx.recv().await.expect("event stream open")
    }

    #[tokio::test(start_paused = true)]
    async fn handler_success_reports_true() {
        let registry = Arc::new(TaskRegistry::new());
        registry
            .register(
                "refresh",
                HandlerFn::arc(|_ctx: GrantContext| async {
                    time::sleep(Duration::from_millis(50)).await;
                    Ok::<(), HandlerError>(())
                }),
            )
            .await
            .unwrap();
        let (coord, scheduler, mut rx) = build(registry).await;

        coord
            .on_grant(grant(1, "refresh", Duration::from_millis(200)))
            .await;

        assert_eq!(next_event(&mut rx).await.kind, EventKind::Started);
        assert_eq!(next_event(&mut rx).await.kind, EventKind::Completed);
        assert_eq!(scheduler.reports(), vec![(GrantHandle::new(1), true)]);
        assert!(coord.active().await.is_empty());
        assert_eq!(coord.late_completions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn started_event_carries_deadline_budget() {
        let registry = Arc::new(TaskRegistry::new());
        registry
            .register(
                "refresh",
                HandlerFn::arc(|_ctx: GrantContext| async { Ok::<(), HandlerError>(()) }),
            )
            .await
            .unwrap();
        let (coord, _scheduler, mut rx) = build(registry).await;

        coord
            .on_grant(grant(1, "refresh", Duration::from_millis(200)))
            .await;

        let started = next_event(&mut rx).await;
        assert_eq!(started.kind, EventKind::Started);
        assert_eq!(started.task.as_deref(), Some("refresh"));
        assert_eq!(started.budget_ms, Some(200));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_expiry_cancels_and_reports_false() {
        let observed_cancel = Arc::new(AtomicBool::new(false));
        let seen = Arc::clone(&observed_cancel);

        let registry = Arc::new(TaskRegistry::new());
        registry
            .register(
                "sync",
                HandlerFn::arc(move |ctx: GrantContext| {
                    let seen = Arc::clone(&seen);
                    async move {
                        ctx.cancelled().await;
                        seen.store(true, Ordering::SeqCst);
                        Err(HandlerError::Canceled)
                    }
                }),
            )
            .await
            .unwrap();
        let (coord, scheduler, mut rx) = build(registry).await;

        coord
            .on_grant(grant(2, "sync", Duration::from_millis(10)))
            .await;

        assert_eq!(next_event(&mut rx).await.kind, EventKind::Started);
        assert_eq!(next_event(&mut rx).await.kind, EventKind::Expired);
        assert_eq!(scheduler.reports(), vec![(GrantHandle::new(2), false)]);

        // let the cooperative exit land
        time::sleep(Duration::from_millis(20)).await;
        assert!(observed_cancel.load(Ordering::SeqCst));
        assert_eq!(coord.late_completions(), 1);
        assert_eq!(scheduler.reports().len(), 1);
        assert!(coord.active().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unregistered_identifier_fails_without_handler() {
        let (coord, scheduler, mut rx) = build(Arc::new(TaskRegistry::new())).await;

        coord
            .on_grant(grant(3, "unknown", Duration::from_millis(100)))
            .await;

        let ev = next_event(&mut rx).await;
        assert_eq!(ev.kind, EventKind::Failed);
        assert_eq!(ev.task.as_deref(), Some("unknown"));
        assert!(ev.reason.unwrap().contains("no handler registered"));
        assert_eq!(scheduler.reports(), vec![(GrantHandle::new(3), false)]);
        assert!(coord.active().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_grant_fails_new_handle_only() {
        let registry = Arc::new(TaskRegistry::new());
        registry
            .register(
                "refresh",
                HandlerFn::arc(|_ctx: GrantContext| async {
                    time::sleep(Duration::from_millis(50)).await;
                    Ok::<(), HandlerError>(())
                }),
            )
            .await
            .unwrap();
        let (coord, scheduler, mut rx) = build(registry).await;

        coord
            .on_grant(grant(10, "refresh", Duration::from_millis(200)))
            .await;
        coord
            .on_grant(grant(11, "refresh", Duration::from_millis(200)))
            .await;

        assert_eq!(next_event(&mut rx).await.kind, EventKind::Started);
        let dup = next_event(&mut rx).await;
        assert_eq!(dup.kind, EventKind::Failed);
        assert!(dup.reason.unwrap().contains("already pending"));

        // the original proceeds to completion, unaffected
        assert_eq!(next_event(&mut rx).await.kind, EventKind::Completed);
        assert_eq!(
            scheduler.reports(),
            vec![(GrantHandle::new(11), false), (GrantHandle::new(10), true)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn late_completion_is_not_reported_twice() {
        let registry = Arc::new(TaskRegistry::new());
        registry
            .register(
                "slowpoke",
                HandlerFn::arc(|_ctx: GrantContext| async {
                    // ignores cancellation on purpose
                    time::sleep(Duration::from_millis(100)).await;
                    Ok::<(), HandlerError>(())
                }),
            )
            .await
            .unwrap();
        let (coord, scheduler, mut rx) = build(registry).await;

        coord
            .on_grant(grant(4, "slowpoke", Duration::from_millis(10)))
            .await;

        assert_eq!(next_event(&mut rx).await.kind, EventKind::Started);
        assert_eq!(next_event(&mut rx).await.kind, EventKind::Expired);

        time::sleep(Duration::from_millis(200)).await;
        assert_eq!(scheduler.reports(), vec![(GrantHandle::new(4), false)]);
        assert_eq!(coord.late_completions(), 1);
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn completion_racing_deadline_reports_exactly_once() {
        let registry = Arc::new(TaskRegistry::new());
        registry
            .register(
                "photo-finish",
                HandlerFn::arc(|_ctx: GrantContext| async {
                    time::sleep(Duration::from_millis(100)).await;
                    Ok::<(), HandlerError>(())
                }),
            )
            .await
            .unwrap();
        let (coord, scheduler, mut rx) = build(registry).await;

        coord
            .on_grant(grant(5, "photo-finish", Duration::from_millis(100)))
            .await;

        assert_eq!(next_event(&mut rx).await.kind, EventKind::Started);
        let terminal = next_event(&mut rx).await;
        assert!(matches!(
            terminal.kind,
            EventKind::Completed | EventKind::Expired
        ));

        time::sleep(Duration::from_millis(200)).await;
        assert_eq!(scheduler.reports().len(), 1);
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn handler_error_reports_failed() {
        let registry = Arc::new(TaskRegistry::new());
        registry
            .register(
                "flaky",
                HandlerFn::arc(|_ctx: GrantContext| async {
                    Err(HandlerError::Fail {
                        error: "backend unreachable".into(),
                    })
                }),
            )
            .await
            .unwrap();
        let (coord, scheduler, mut rx) = build(registry).await;

        coord
            .on_grant(grant(6, "flaky", Duration::from_millis(100)))
            .await;

        assert_eq!(next_event(&mut rx).await.kind, EventKind::Started);
        let ev = next_event(&mut rx).await;
        assert_eq!(ev.kind, EventKind::Failed);
        assert!(ev.reason.unwrap().contains("backend unreachable"));
        assert_eq!(scheduler.reports(), vec![(GrantHandle::new(6), false)]);
    }

    #[tokio::test(start_paused = true)]
    async fn handler_panic_is_contained() {
        let registry = Arc::new(TaskRegistry::new());
        registry
            .register(
                "buggy",
                HandlerFn::arc(|ctx: GrantContext| async move {
                    if !ctx.is_cancelled() {
                        panic!("kaboom");
                    }
                    Ok::<(), HandlerError>(())
                }),
            )
            .await
            .unwrap();
        registry
            .register(
                "fine",
                HandlerFn::arc(|_ctx: GrantContext| async { Ok::<(), HandlerError>(()) }),
            )
            .await
            .unwrap();
        let (coord, scheduler, mut rx) = build(registry).await;

        coord
            .on_grant(grant(7, "buggy", Duration::from_millis(100)))
            .await;

        assert_eq!(next_event(&mut rx).await.kind, EventKind::Started);
        let ev = next_event(&mut rx).await;
        assert_eq!(ev.kind, EventKind::Failed);
        assert!(ev.reason.unwrap().contains("kaboom"));
        assert_eq!(scheduler.reports(), vec![(GrantHandle::new(7), false)]);

        // the coordinator keeps serving other grants
        coord
            .on_grant(grant(8, "fine", Duration::from_millis(100)))
            .await;
        assert_eq!(next_event(&mut rx).await.kind, EventKind::Started);
        assert_eq!(next_event(&mut rx).await.kind, EventKind::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn grants_for_different_identifiers_run_concurrently() {
        let registry = Arc::new(TaskRegistry::new());
        registry
            .register(
                "refresh",
                HandlerFn::arc(|_ctx: GrantContext| async {
                    time::sleep(Duration::from_millis(50)).await;
                    Ok::<(), HandlerError>(())
                }),
            )
            .await
            .unwrap();
        registry
            .register(
                "sync",
                HandlerFn::arc(|_ctx: GrantContext| async {
                    time::sleep(Duration::from_millis(80)).await;
                    Ok::<(), HandlerError>(())
                }),
            )
            .await
            .unwrap();
        let (coord, scheduler, mut rx) = build(registry).await;

        coord
            .on_grant(grant(1, "refresh", Duration::from_millis(500)))
            .await;
        coord
            .on_grant(grant(2, "sync", Duration::from_millis(500)))
            .await;
        assert_eq!(coord.active().await, vec!["refresh", "sync"]);

        let mut kinds = Vec::new();
        for _ in 0..4 {
            let ev = next_event(&mut rx).await;
            kinds.push((ev.kind, ev.task.unwrap().to_string()));
        }
        assert_eq!(
            kinds,
            vec![
                (EventKind::Started, "refresh".to_string()),
                (EventKind::Started, "sync".to_string()),
                (EventKind::Completed, "refresh".to_string()),
                (EventKind::Completed, "sync".to_string()),
            ]
        );
        assert_eq!(
            scheduler.reports(),
            vec![(GrantHandle::new(1), true), (GrantHandle::new(2), true)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn identifier_is_grantable_again_after_completion() {
        let registry = Arc::new(TaskRegistry::new());
        registry
            .register(
                "refresh",
                HandlerFn::arc(|_ctx: GrantContext| async { Ok::<(), HandlerError>(()) }),
            )
            .await
            .unwrap();
        let (coord, scheduler, mut rx) = build(registry).await;

        coord
            .on_grant(grant(1, "refresh", Duration::from_millis(100)))
            .await;
        assert_eq!(next_event(&mut rx).await.kind, EventKind::Started);
        assert_eq!(next_event(&mut rx).await.kind, EventKind::Completed);

        coord
            .on_grant(grant(2, "refresh", Duration::from_millis(100)))
            .await;
        assert_eq!(next_event(&mut rx).await.kind, EventKind::Started);
        assert_eq!(next_event(&mut rx).await.kind, EventKind::Completed);

        assert_eq!(
            scheduler.reports(),
            vec![(GrantHandle::new(1), true), (GrantHandle::new(2), true)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_expires_active_grants() {
        let registry = Arc::new(TaskRegistry::new());
        registry
            .register(
                "sync",
                HandlerFn::arc(|ctx: GrantContext| async move {
                    ctx.cancelled().await;
                    Err(HandlerError::Canceled)
                }),
            )
            .await
            .unwrap();
        let (coord, scheduler, mut rx) = build(registry).await;

        coord.on_grant(grant(9, "sync", Duration::from_secs(60))).await;
        assert_eq!(next_event(&mut rx).await.kind, EventKind::Started);

        coord.shutdown().await.unwrap();
        // the watchdog (woken by the cancel) and the handler's cooperative
        // exit race for the claim; either way the grant settles once
        let terminal = next_event(&mut rx).await;
        assert!(matches!(
            terminal.kind,
            EventKind::Expired | EventKind::Failed
        ));
        assert_eq!(scheduler.reports(), vec![(GrantHandle::new(9), false)]);
        assert!(coord.active().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_lists_handlers_that_ignore_cancellation() {
        let registry = Arc::new(TaskRegistry::new());
        registry
            .register(
                "stubborn",
                HandlerFn::arc(|_ctx: GrantContext| async {
                    time::sleep(Duration::from_secs(3600)).await;
                    Ok::<(), HandlerError>(())
                }),
            )
            .await
            .unwrap();
        let scheduler = Arc::new(RecordingScheduler::default());
        let cfg = Config {
            grace: Duration::from_millis(50),
            ..Config::default()
        };
        let coord = Coordinator::builder(cfg).build(registry, scheduler.clone());
        let mut rx = coord.subscribe();

        coord
            .on_grant(grant(12, "stubborn", Duration::from_secs(7200)))
            .await;
        assert_eq!(next_event(&mut rx).await.kind, EventKind::Started);

        let err = coord.shutdown().await.unwrap_err();
        match err {
            RuntimeError::GraceExceeded { stuck, .. } => {
                assert_eq!(stuck, vec!["stubborn".to_string()]);
            }
        }
        // the watchdog still settled the grant exactly once
        assert_eq!(next_event(&mut rx).await.kind, EventKind::Expired);
        assert_eq!(scheduler.reports(), vec![(GrantHandle::new(12), false)]);
    }
}
