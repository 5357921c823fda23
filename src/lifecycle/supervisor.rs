//! Per-connection task spawning.
//!
//! Tasks are fire-and-forget from the acceptor's point of view, but a panic
//! inside one is caught and logged with its connection id instead of
//! vanishing with the task.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tokio::task::JoinHandle;

use crate::net::connection::{ConnectionGuard, ConnectionTracker};

#[derive(Debug, Clone, Default)]
pub struct Supervisor {
    tracker: ConnectionTracker,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve an id and count the connection as in flight.
    pub fn track(&self) -> ConnectionGuard {
        self.tracker.track()
    }

    /// Spawn `task` on the runtime. The guard is released when the task ends,
    /// whether it returned or panicked.
    pub fn spawn<F>(&self, guard: ConnectionGuard, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(async move {
            let id = guard.id();
            let _guard = guard;

            if let Err(panic) = AssertUnwindSafe(task).catch_unwind().await {
                tracing::error!(
                    connection_id = %id,
                    panic = panic_message(panic.as_ref()),
                    "Connection task panicked"
                );
            }
        })
    }

    /// Connection tasks that have not finished yet.
    pub fn in_flight(&self) -> u64 {
        self.tracker.active_count()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
