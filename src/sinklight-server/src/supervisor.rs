// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Session restart loop.
//!
//! A lost broker connection tears the whole session down and runs device
//! initialization again after a backoff delay. Hardware faults are not
//! retried.

use std::future::Future;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time;
use tracing::{error, info, warn};

use sinklight_core::controller::{ExponentialBackoff, RetryPolicy};
use sinklight_core::{BusError, DynResult};

/// Why a session ended.
#[derive(Debug, Error)]
pub enum SessionFault {
    #[error("hardware fault: {0}")]
    Hardware(String),

    #[error("bus disconnected: {0}")]
    BusDisconnected(String),

    #[error("bus error: {0}")]
    Bus(#[from] BusError),
}

impl SessionFault {
    pub fn is_restartable(&self) -> bool {
        !matches!(self, Self::Hardware(_))
    }
}

/// Run sessions until one ends cleanly or fails fatally.
///
/// `run` receives a flag it sets once the session reaches the connected
/// state; a session that got that far resets the backoff.
pub async fn supervise<F, Fut>(backoff: ExponentialBackoff, mut run: F) -> DynResult<()>
where
    F: FnMut(watch::Sender<bool>) -> Fut,
    Fut: Future<Output = Result<(), SessionFault>>,
{
    let mut failures: u32 = 0;
    let mut sessions: u64 = 0;
    loop {
        sessions += 1;
        let (connected_tx, connected_rx) = watch::channel(false);
        let fault = match run(connected_tx).await {
            Ok(()) => {
                info!("Session {} ended cleanly", sessions);
                return Ok(());
            }
            Err(fault) => fault,
        };

        if !fault.is_restartable() {
            error!("Session {} failed: {}", sessions, fault);
            return Err(fault.into());
        }
        if *connected_rx.borrow() {
            failures = 0;
        }
        if !backoff.should_retry(failures) {
            error!(
                "Session {} failed: {} (giving up after {} restarts)",
                sessions, fault, failures
            );
            return Err(fault.into());
        }

        let delay = backoff.delay(failures);
        failures = failures.saturating_add(1);
        warn!(
            "Session {} ended: {}; restarting in {:?}",
            sessions, fault, delay
        );
        time::sleep(delay).await;
    }
}
