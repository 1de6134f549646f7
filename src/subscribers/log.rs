//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//!
//! ## Output format
//! ```text
//! [started] task=refresh budget_ms=150
//! [completed] task=refresh
//! [expired] task=sync
//! [failed] task=unknown reason="no handler registered for 'unknown'"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Simple stdout logging subscriber.
///
/// Enabled via the `logging` feature. Prints human-readable event
/// descriptions to stdout for debugging and demonstration purposes.
///
/// Not intended for production use - implement a custom [`Subscribe`] for
/// structured logging or metrics collection.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::Started => {
                if let (Some(task), Some(budget)) = (&e.task, e.budget_ms) {
                    println!("[started] task={task} budget_ms={budget}");
                }
            }
            EventKind::Completed => {
                println!("[completed] task={:?}", e.task);
            }
            EventKind::Expired => {
                println!("[expired] task={:?}", e.task);
            }
            EventKind::Failed => {
                println!("[failed] task={:?} reason={:?}", e.task, e.reason);
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
