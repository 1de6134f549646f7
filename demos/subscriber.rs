//! # Example: custom subscriber
//!
//! Demonstrates plugging a custom [`Subscribe`] implementation into the
//! coordinator: a tiny metrics collector counting terminal outcomes.
//!
//! ## Run
//! ```bash
//! cargo run --example subscriber
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use bgbridge::{
    Config, Coordinator, Event, EventKind, ExecutionRequest, Grant, GrantContext, GrantHandle,
    HandlerError, HandlerFn, ScheduleError, SchedulerPort, Subscribe, TaskRegistry,
};

struct QuietScheduler;

impl SchedulerPort for QuietScheduler {
    fn request_execution(&self, _req: &ExecutionRequest) -> Result<(), ScheduleError> {
        Ok(())
    }

    fn report_completion(&self, _handle: GrantHandle, _success: bool) {}
}

/// Counts terminal outcomes per kind.
#[derive(Default)]
struct OutcomeCounter {
    completed: AtomicU32,
    expired: AtomicU32,
    failed: AtomicU32,
}

#[async_trait]
impl Subscribe for OutcomeCounter {
    async fn on_event(&self, event: &Event) {
        match event.kind {
            EventKind::Completed => self.completed.fetch_add(1, Ordering::Relaxed),
            EventKind::Expired => self.expired.fetch_add(1, Ordering::Relaxed),
            EventKind::Failed => self.failed.fetch_add(1, Ordering::Relaxed),
            EventKind::Started => 0,
        };
    }

    fn name(&self) -> &'static str {
        "outcome_counter"
    }

    fn queue_capacity(&self) -> usize {
        256
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    println!("=== subscriber example ===\n");

    let registry = Arc::new(TaskRegistry::new());
    registry
        .register(
            "quick",
            HandlerFn::arc(|_ctx: GrantContext| async { Ok::<(), HandlerError>(()) }),
        )
        .await?;
    registry
        .register(
            "slow",
            HandlerFn::arc(|_ctx: GrantContext| async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok::<(), HandlerError>(())
            }),
        )
        .await?;
    registry.seal();

    let counter = Arc::new(OutcomeCounter::default());
    let subs: Vec<Arc<dyn Subscribe>> = vec![counter.clone()];
    let coordinator = Coordinator::builder(Config::default())
        .with_subscribers(subs)
        .build(registry, Arc::new(QuietScheduler));

    // a successful grant, an unknown identifier, and a duplicate pair
    for (handle, id) in [(1, "quick"), (2, "nope"), (3, "slow"), (4, "slow")] {
        coordinator
            .on_grant(Grant::new(
                GrantHandle::new(handle),
                id,
                Instant::now() + Duration::from_secs(1),
                CancellationToken::new(),
            ))
            .await;
    }

    // let the fan-out workers drain
    tokio::time::sleep(Duration::from_millis(200)).await;
    println!(
        "completed={} expired={} failed={}",
        counter.completed.load(Ordering::Relaxed),
        counter.expired.load(Ordering::Relaxed),
        counter.failed.load(Ordering::Relaxed),
    );

    coordinator.shutdown().await?;
    println!("\n=== example completed successfully ===");
    Ok(())
}
