//! # Example: expiry
//!
//! Demonstrates the deadline watchdog: a handler that cannot finish within
//! its window is signaled to stop and the grant is reported as failed.
//!
//! Shows how to:
//! - Run a handler that overruns a short deadline
//! - Observe the `Expired` event and the cooperative cancellation signal
//! - Verify only one completion report reaches the scheduler
//!
//! ## Run
//! ```bash
//! cargo run --example expiry
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use bgbridge::{
    Config, Coordinator, EventKind, ExecutionRequest, Grant, GrantContext, GrantHandle,
    HandlerError, HandlerFn, ScheduleError, SchedulerPort, TaskRegistry,
};

struct PrintScheduler;

impl SchedulerPort for PrintScheduler {
    fn request_execution(&self, _req: &ExecutionRequest) -> Result<(), ScheduleError> {
        Ok(())
    }

    fn report_completion(&self, handle: GrantHandle, success: bool) {
        println!(
            "[scheduler] completion report: handle={} success={success}",
            handle.raw()
        );
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    println!("=== expiry example ===\n");

    let registry = Arc::new(TaskRegistry::new());
    registry
        .register(
            "sync",
            HandlerFn::arc(|ctx: GrantContext| async move {
                println!("[handler] syncing, this will not finish in time...");
                loop {
                    if ctx.is_cancelled() {
                        println!("[handler] cancel observed, exiting cooperatively");
                        return Err(HandlerError::Canceled);
                    }
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            }),
        )
        .await?;
    registry.seal();

    let coordinator =
        Coordinator::builder(Config::default()).build(registry, Arc::new(PrintScheduler));

    let mut rx = coordinator.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(ev) = rx.recv().await {
            println!("[event] seq={} kind={:?} task={:?}", ev.seq, ev.kind, ev.task);
            if ev.kind == EventKind::Expired {
                break;
            }
        }
    });

    // a window far too short for the handler above
    let grant = Grant::new(
        GrantHandle::new(1),
        "sync",
        Instant::now() + Duration::from_millis(200),
        CancellationToken::new(),
    );
    coordinator.on_grant(grant).await;

    printer.await?;

    // give the cooperative exit a moment, then inspect diagnostics
    tokio::time::sleep(Duration::from_millis(200)).await;
    println!(
        "\nlate completions recorded: {}",
        coordinator.late_completions()
    );

    coordinator.shutdown().await?;
    println!("\n=== example completed successfully ===");
    Ok(())
}
