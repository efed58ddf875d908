//! # Escalation Sweeper
//!
//! Background task that periodically calls [`DisputeService::sweep`] to
//! move stalled chats to the jury. A sweep that fails is logged and retried
//! on the next tick; the task only stops when [`SweeperHandle::shutdown`]
//! is called.

use std::sync::Arc;
use std::time::Duration;

use kome_dispute::DisputeService;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Handle to a running sweeper task.
pub struct SweeperHandle {
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the sweeper to stop and wait for it to exit. A sweep already
    /// in progress runs to completion first.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "escalation sweeper task panicked");
        }
    }
}

/// Spawn the sweeper on the current Tokio runtime.
pub fn spawn(service: DisputeService, interval: Duration) -> SweeperHandle {
    let shutdown = Arc::new(Notify::new());
    let signal = shutdown.clone();
    let task = tokio::spawn(async move {
        tracing::info!(interval_secs = interval.as_secs(), "escalation sweeper started");
        loop {
            tokio::select! {
                _ = signal.notified() => {
                    tracing::info!("escalation sweeper shutting down");
                    break;
                }
                _ = sleep(interval) => {
                    match service.sweep(service.now()).await {
                        Ok(report) => tracing::debug!(
                            scanned = report.scanned,
                            escalated = report.escalated,
                            failed = report.failed,
                            "escalation sweep tick"
                        ),
                        Err(e) => tracing::warn!(error = %e, "escalation sweep failed"),
                    }
                }
            }
        }
    });
    SweeperHandle { shutdown, task }
}
