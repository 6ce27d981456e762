// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Closed-loop convergence towards the desired state.
//!
//! The actuator can only toggle, so the loop samples the sensor, pulses on
//! mismatch, waits the settle delay and samples again until the light matches
//! the latest desired state.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::hw::{Actuator, Sensor};
use crate::state::DesiredState;

use super::machine::{ConvergenceEvent, ConvergenceMachine, ConvergenceState};
use super::policies::{ConvergencePolicy, RetryPolicy};

/// Everything the convergence task owns. The actuator is moved in here and
/// nowhere else, which keeps pulses serialized.
pub struct ConvergenceTask {
    pub sensor: Arc<dyn Sensor>,
    pub actuator: Actuator,
    pub policy: ConvergencePolicy,
    pub desired_rx: watch::Receiver<Option<DesiredState>>,
    pub status_tx: watch::Sender<ConvergenceState>,
}

impl ConvergenceTask {
    fn apply(&self, machine: &mut ConvergenceMachine, event: ConvergenceEvent) {
        if machine.process_event(event) {
            self.status_tx.send_replace(*machine.state());
        }
    }

    /// Current target; a newer command overwrites it in place.
    fn latest_target(&mut self, fallback: DesiredState) -> DesiredState {
        (*self.desired_rx.borrow_and_update()).unwrap_or(fallback)
    }

    async fn converge(&mut self, machine: &mut ConvergenceMachine, first: DesiredState) {
        let mut target = first;
        let sensed = self.sensor.read();
        self.apply(machine, ConvergenceEvent::TargetSet { target, sensed });
        if !machine.state().is_converging() {
            debug!("Command {} already satisfied, no toggle needed", target);
            return;
        }
        info!("Converging to {} (sensed {})", target, sensed);

        loop {
            // One read per pass, so the machine and the match check agree
            let sensed = self.sensor.read();
            let latest = self.latest_target(target);
            if latest != target {
                info!("Target superseded: {} -> {}", target, latest);
                target = latest;
                self.apply(machine, ConvergenceEvent::TargetSet { target, sensed });
            }

            let attempts = machine.state().attempts();
            if target.is_met_by(sensed) {
                self.apply(machine, ConvergenceEvent::Matched);
                info!("Converged to {} after {} attempt(s)", target, attempts);
                return;
            }

            if !self.policy.should_retry(attempts) {
                self.apply(machine, ConvergenceEvent::CutoffReached);
                error!(
                    "Giving up on {} after {} attempt(s), sensed state still {}",
                    target, attempts, sensed
                );
                return;
            }

            self.apply(machine, ConvergenceEvent::Attempted);
            let attempt = machine.state().attempts();
            info!(
                "Desired = {}, sensed = {} >> toggling control line (attempt {})",
                target, sensed, attempt
            );
            if let Err(e) = self.actuator.pulse().await {
                warn!("Toggle attempt {} failed: {}", attempt, e);
            }
            time::sleep(self.policy.delay(attempt)).await;
        }
    }
}

/// Run the convergence loop until the desired-state sender goes away.
pub async fn run_convergence_task(mut task: ConvergenceTask) {
    let mut machine = ConvergenceMachine::new();
    loop {
        if task.desired_rx.changed().await.is_err() {
            break;
        }
        let Some(target) = *task.desired_rx.borrow_and_update() else {
            continue;
        };
        task.converge(&mut machine, target).await;
    }
    info!(
        "Convergence task shutting down ({} pulses issued)",
        task.actuator.pulse_count()
    );
}
