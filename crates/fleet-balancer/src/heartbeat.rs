//! Heartbeat loop: periodic health sweeps.
//!
//! Sleeps for the configured interval, then runs one sweep: every
//! registered provider is probed concurrently and the candidate set is
//! refreshed once all probes have answered or timed out. The loop never
//! exits on its own; the orchestrator aborts it on shutdown or drop.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::orchestrator::Fleet;

pub(crate) async fn run_heartbeat_loop(fleet: Arc<Fleet>, interval: Duration) {
    info!(interval = ?interval, "heartbeat loop started");

    let mut round: u64 = 0;
    loop {
        tokio::time::sleep(interval).await;
        round += 1;
        let summary = fleet.sweep().await;
        debug!(round, in_service = summary.in_service, "heartbeat");
    }
}
