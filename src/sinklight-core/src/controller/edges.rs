// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::sync::Arc;

use tracing::{info, warn};

use crate::hw::{EdgeReceiver, Sensor};
use crate::reporter::StateReporter;

/// Report the sensed level once per dequeued edge.
///
/// The level is read when the edge is handled, not when it fired, so a
/// bouncing input reports where it settled.
pub async fn run_edge_task(
    sensor: Arc<dyn Sensor>,
    mut edges: EdgeReceiver,
    reporter: StateReporter,
) {
    let mut seen_drops = 0;
    while edges.recv().await.is_some() {
        let dropped = edges.dropped();
        if dropped > seen_drops {
            warn!(
                "Edge queue full, {} edge notification(s) coalesced",
                dropped - seen_drops
            );
            seen_drops = dropped;
        }

        let state = sensor.read();
        info!("State input changed, level = {}", state);
        if let Err(e) = reporter.report(state).await {
            warn!("State report after edge failed: {}", e);
        }
    }
}
