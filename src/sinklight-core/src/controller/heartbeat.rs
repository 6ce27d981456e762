// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::hw::Sensor;
use crate::reporter::StateReporter;

pub const DEFAULT_HEARTBEAT_PERIOD: Duration = Duration::from_secs(60);

/// Report the current level once per period, starting one period from now.
pub async fn run_heartbeat_task(
    period: Duration,
    sensor: Arc<dyn Sensor>,
    reporter: StateReporter,
) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let state = sensor.read();
        debug!("Heartbeat, level = {}", state);
        if let Err(e) = reporter.report(state).await {
            warn!("Heartbeat report failed: {}", e);
        }
    }
}
