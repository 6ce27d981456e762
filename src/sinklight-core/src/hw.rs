// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Hardware seams: the level-sensing state input and the toggle-only
//! control line.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::error::{ActuatorError, SensorError};
use crate::state::SensedState;

/// Default capacity of the edge hand-off queue.
pub const DEFAULT_EDGE_QUEUE_CAPACITY: usize = 10;

/// Binary state input with change interrupts.
pub trait Sensor: Send + Sync {
    /// Instantaneous input level. Must not block.
    fn read(&self) -> SensedState;

    /// Register the notifier raised on every rising and falling edge.
    ///
    /// Backends call [`EdgeNotifier::notify`] from their interrupt context.
    /// The notification carries no level; handlers re-read via [`Sensor::read`]
    /// and must tolerate a level that already moved past the triggering edge.
    fn on_change(&mut self, notifier: EdgeNotifier) -> Result<(), SensorError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineDirection {
    /// Line floats; external controls may drive it.
    Input,
    Output,
}

impl LineDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

impl fmt::Display for LineDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw control output the [`Actuator`] drives.
pub trait ControlLine: Send {
    fn pin(&self) -> u32;

    fn set_direction(&mut self, direction: LineDirection) -> Result<(), ActuatorError>;

    fn set_level(&mut self, high: bool) -> Result<(), ActuatorError>;
}

/// Non-blocking edge trigger handed to a [`Sensor`] backend.
///
/// Overflow policy is drop-newest: an edge raised while the queue is full is
/// discarded and counted. Edges carry no payload, so the ones already queued
/// still produce a re-read after the burst.
#[derive(Debug, Clone)]
pub struct EdgeNotifier {
    tx: mpsc::Sender<()>,
    dropped: Arc<AtomicU64>,
}

impl EdgeNotifier {
    /// Queue one edge. Returns false when the edge was dropped.
    pub fn notify(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(TrySendError::Closed(())) => false,
        }
    }
}

/// Worker side of the edge hand-off queue.
#[derive(Debug)]
pub struct EdgeReceiver {
    rx: mpsc::Receiver<()>,
    dropped: Arc<AtomicU64>,
}

impl EdgeReceiver {
    pub async fn recv(&mut self) -> Option<()> {
        self.rx.recv().await
    }

    /// Total edges discarded because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Create the bounded edge hand-off queue.
pub fn edge_channel(capacity: usize) -> (EdgeNotifier, EdgeReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    (
        EdgeNotifier {
            tx,
            dropped: Arc::clone(&dropped),
        },
        EdgeReceiver { rx, dropped },
    )
}

/// Toggle-only actuator.
///
/// A pulse switches the line to output, holds it low for the toggle interval,
/// releases it high and returns the line to input so it floats while idle.
/// Awaiting [`Actuator::pulse`] holds the caller for the whole pulse width;
/// the actuator is owned by exactly one task, so pulses never overlap.
///
/// A pulse cancelled mid-way (its task aborted) leaves the line driven until
/// the actuator is dropped, which releases it back to input.
pub struct Actuator {
    line: Box<dyn ControlLine>,
    toggle_interval: Duration,
    pulses: u64,
    driven: bool,
}

impl Actuator {
    pub const DEFAULT_TOGGLE_INTERVAL: Duration = Duration::from_millis(200);

    pub fn new(line: Box<dyn ControlLine>, toggle_interval: Duration) -> Self {
        Self {
            line,
            toggle_interval,
            pulses: 0,
            driven: false,
        }
    }

    /// Number of completed pulses.
    pub fn pulse_count(&self) -> u64 {
        self.pulses
    }

    pub async fn pulse(&mut self) -> Result<(), ActuatorError> {
        let result = self.drive_pulse().await;
        if result.is_err() {
            self.release("pulse error");
        }
        result
    }

    async fn drive_pulse(&mut self) -> Result<(), ActuatorError> {
        self.driven = true;
        self.line.set_direction(LineDirection::Output)?;
        self.line.set_level(false)?;
        tokio::time::sleep(self.toggle_interval).await;
        self.line.set_level(true)?;
        self.line.set_direction(LineDirection::Input)?;
        self.driven = false;
        self.pulses += 1;
        debug!(
            "Pulsed control line {} for {:?}",
            self.line.pin(),
            self.toggle_interval
        );
        Ok(())
    }

    /// Return the line to input so it floats.
    fn release(&mut self, why: &str) {
        self.driven = false;
        if let Err(e) = self.line.set_direction(LineDirection::Input) {
            warn!("Failed to release control line after {}: {}", why, e);
        }
    }
}

impl Drop for Actuator {
    fn drop(&mut self) {
        if self.driven {
            self.release("cancelled pulse");
        }
    }
}
