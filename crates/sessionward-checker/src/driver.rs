//! The reconciliation loop: one task, two triggers.
//!
//! ```text
//! loop {
//!     select! {
//!         shutdown          → stop
//!         activity notified → spawn reconcile()
//!         poll tick         → spawn reconcile()
//!     }
//! }
//! ```
//!
//! Each reconciliation is spawned rather than awaited in place, so the
//! loop keeps draining triggers while a proactive renewal is on the wire.
//! Triggers that arrive meanwhile are dropped by the checker's running
//! flag, never queued.

use std::sync::Arc;

use sessionward_renewal::SessionActions;
use sessionward_tick::PollScheduler;
use tokio::sync::{Notify, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use crate::SessionChecker;

/// Handle to a running reconciliation loop.
///
/// Dropping the handle without calling [`shutdown`](Self::shutdown)
/// aborts the loop task.
pub struct ReconcileLoop {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ReconcileLoop {
    /// Stops the loop and waits for it to exit. Idempotent.
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for ReconcileLoop {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

impl<A: SessionActions> SessionChecker<A> {
    /// Spawns the reconciliation loop.
    ///
    /// `poll` drives the periodic trigger (a zero-interval scheduler means
    /// activity-only). `activity` is notified by the activity tracker's
    /// pulse hook; a notification sent while the loop is busy is kept as a
    /// single permit, so bursts collapse into one reconciliation.
    pub fn spawn_loop(&self, mut poll: PollScheduler, activity: Arc<Notify>) -> ReconcileLoop {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let checker = self.clone();

        let task = tokio::spawn(async move {
            info!(interval = ?poll.interval(), "reconciliation loop started");

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = activity.notified() => {
                        trace!("activity trigger");
                        checker.spawn_reconcile();
                    }
                    tick = poll.wait_for_tick() => {
                        trace!(tick = tick.tick, late = tick.late, "poll trigger");
                        checker.spawn_reconcile();
                    }
                }
            }

            info!(ticks = poll.tick_count(), "reconciliation loop stopped");
        });

        ReconcileLoop {
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }

    fn spawn_reconcile(&self) {
        let checker = self.clone();
        tokio::spawn(async move {
            let outcome = checker.reconcile().await;
            debug!(?outcome, "reconciled");
        });
    }
}
