//! # Example: refresh
//!
//! Demonstrates the happy path: a handler that finishes well before its
//! deadline.
//!
//! Shows how to:
//! - Register a handler in the [`TaskRegistry`] and seal the registry
//! - Build a [`Coordinator`] against a (fake) scheduler port
//! - Deliver a grant and watch the lifecycle events
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► register "refresh" handler, seal registry
//!   ├─► build coordinator with an in-process scheduler fake
//!   ├─► deliver Grant { handle: 1, deadline: now + 5s }
//!   │     ├─► publish Started
//!   │     ├─► handler works in bounded chunks
//!   │     └─► publish Completed + report success=true
//!   └─► shutdown
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example refresh
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use bgbridge::{
    Config, Coordinator, EventKind, ExecutionRequest, Grant, GrantContext, GrantHandle, HandlerFn,
    ScheduleError, SchedulerPort, TaskRegistry,
};

/// In-process stand-in for the OS scheduler boundary.
struct PrintScheduler;

impl SchedulerPort for PrintScheduler {
    fn request_execution(&self, req: &ExecutionRequest) -> Result<(), ScheduleError> {
        println!("[scheduler] execution requested for '{}'", req.identifier);
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
    println!("=== refresh example ===\n");

    // 1. Setup phase: bind the identifier, then seal the registry.
    let registry = Arc::new(TaskRegistry::new());
    registry
        .register(
            "refresh",
            HandlerFn::arc(|ctx: GrantContext| async move {
                println!("[handler] starting, {}ms budget", ctx.remaining().as_millis());
                for chunk in 1..=3u32 {
                    if ctx.is_cancelled() {
                        return Err(bgbridge::HandlerError::Canceled);
                    }
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    println!("[handler] chunk {chunk}/3 done");
                }
                Ok(())
            }),
        )
        .await?;
    registry.seal();

    // 2. Build the coordinator.
    let scheduler = Arc::new(PrintScheduler);
    let coordinator = Coordinator::builder(Config::default()).build(registry, scheduler.clone());

    // 3. Setup code would ask the OS for a future window.
    scheduler.request_execution(
        &ExecutionRequest::new("refresh").with_earliest(std::time::SystemTime::now()),
    )?;

    // 4. Print lifecycle events as they happen.
    let mut rx = coordinator.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(ev) = rx.recv().await {
            println!("[event] seq={} kind={:?} task={:?}", ev.seq, ev.kind, ev.task);
            if ev.kind == EventKind::Completed {
                break;
            }
        }
    });

    // 5. The OS delivers a grant; here we hand one over manually.
    let grant = Grant::new(
        GrantHandle::new(1),
        "refresh",
        Instant::now() + Duration::from_secs(5),
        CancellationToken::new(),
    );
    coordinator.on_grant(grant).await;

    printer.await?;
    coordinator.shutdown().await?;

    println!("\n=== example completed successfully ===");
    Ok(())
}
