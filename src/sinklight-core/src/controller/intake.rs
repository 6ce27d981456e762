// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use tokio::sync::watch;
use tracing::{debug, info};

use crate::queue::CommandQueue;
use crate::state::DesiredState;

use super::machine::ConvergenceState;

/// Move queued commands into the desired-state slot, in receipt order.
///
/// The slot is last-write-wins: a command taken while the loop is converging
/// replaces its target in place.
pub async fn run_intake_task(
    queue: CommandQueue,
    desired_tx: watch::Sender<Option<DesiredState>>,
    status_rx: watch::Receiver<ConvergenceState>,
) {
    while !desired_tx.is_closed() {
        let cmd = queue.pop().await;
        let status = *status_rx.borrow();
        if let ConvergenceState::Converging { target, attempts } = status {
            if target != cmd.desired.state() {
                info!(
                    "Command #{} ({}) supersedes in-flight target {} after {} attempt(s)",
                    cmd.seq, cmd.desired, target, attempts
                );
            }
        }
        desired_tx.send_replace(Some(cmd.desired));
        debug!("Command #{} ({}) handed to convergence", cmd.seq, cmd.desired);
    }
}
