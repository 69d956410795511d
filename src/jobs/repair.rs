//! Background job: replay queued occupancy repairs.
//!
//! An approval whose classroom write failed leaves an entry in
//! `occupancy_repairs`. Each tick re-applies up to `BATCH` of them.

use std::time::Duration;
use tokio::time;

use crate::workflow::BookingWorkflow;

const BATCH: i64 = 50;

/// Spawn the repair task. Call this once at startup.
pub fn spawn(workflow: BookingWorkflow, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(every);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match workflow.replay_repairs(BATCH).await {
                Ok(report) if report.attempted > 0 => {
                    tracing::info!(
                        attempted = report.attempted,
                        resolved = report.resolved,
                        failed = report.failed,
                        "occupancy repair pass finished"
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::error!("occupancy repair job failed: {}", e),
            }
        }
    })
}
