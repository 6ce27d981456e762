// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Light controller: wires the sensor, actuator and bus into the four
//! long-running tasks (edge reporting, command intake, convergence and
//! heartbeat).

pub mod convergence;
pub mod edges;
pub mod heartbeat;
pub mod intake;
pub mod machine;
pub mod policies;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bus::{MessageBus, Topics};
use crate::error::{BusError, SensorError};
use crate::hw::{edge_channel, Actuator, Sensor, DEFAULT_EDGE_QUEUE_CAPACITY};
use crate::payload::decode_command;
use crate::queue::{CommandQueue, DEFAULT_COMMAND_QUEUE_CAPACITY};
use crate::reporter::StateReporter;
use crate::state::{DesiredState, SensedState};

pub use convergence::{run_convergence_task, ConvergenceTask};
pub use edges::run_edge_task;
pub use heartbeat::{run_heartbeat_task, DEFAULT_HEARTBEAT_PERIOD};
pub use intake::run_intake_task;
pub use machine::{ConvergenceEvent, ConvergenceMachine, ConvergenceState};
pub use policies::{ConvergencePolicy, ExponentialBackoff, RetryPolicy};

/// Controller tuning.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub policy: ConvergencePolicy,
    pub heartbeat_period: Duration,
    pub command_queue_capacity: usize,
    pub edge_queue_capacity: usize,
    pub topics: Topics,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            policy: ConvergencePolicy::default(),
            heartbeat_period: DEFAULT_HEARTBEAT_PERIOD,
            command_queue_capacity: DEFAULT_COMMAND_QUEUE_CAPACITY,
            edge_queue_capacity: DEFAULT_EDGE_QUEUE_CAPACITY,
            topics: Topics::default(),
        }
    }
}

/// Handles to the controller's background tasks. Aborted on drop.
#[derive(Debug, Default)]
pub struct ControllerTasks {
    handles: Vec<JoinHandle<()>>,
}

impl ControllerTasks {
    fn push(&mut self, handle: JoinHandle<()>) {
        self.handles.push(handle);
    }

    fn abort_all(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for ControllerTasks {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            self.abort_all();
            info!("Light controller stopped");
        }
    }
}

pub struct LightController {
    sensor: Arc<dyn Sensor>,
    queue: CommandQueue,
    reporter: StateReporter,
    topics: Topics,
    status_rx: watch::Receiver<ConvergenceState>,
    _tasks: ControllerTasks,
}

impl LightController {
    /// Register for edges and spawn the controller tasks.
    ///
    /// Fails only if the sensor refuses the edge registration; nothing has
    /// been spawned at that point.
    pub fn start(
        config: ControllerConfig,
        mut sensor: Box<dyn Sensor>,
        actuator: Actuator,
        bus: Arc<dyn MessageBus>,
    ) -> Result<Self, SensorError> {
        let (notifier, edges) = edge_channel(config.edge_queue_capacity);
        sensor.on_change(notifier)?;
        let sensor: Arc<dyn Sensor> = Arc::from(sensor);

        let queue = CommandQueue::new(config.command_queue_capacity);
        let reporter = StateReporter::new(bus, config.topics.state.clone());
        let (desired_tx, desired_rx) = watch::channel::<Option<DesiredState>>(None);
        let (status_tx, status_rx) = watch::channel(ConvergenceState::Idle);

        let mut tasks = ControllerTasks::default();
        tasks.push(tokio::spawn(run_edge_task(
            Arc::clone(&sensor),
            edges,
            reporter.clone(),
        )));
        tasks.push(tokio::spawn(run_intake_task(
            queue.clone(),
            desired_tx,
            status_rx.clone(),
        )));
        tasks.push(tokio::spawn(run_convergence_task(ConvergenceTask {
            sensor: Arc::clone(&sensor),
            actuator,
            policy: config.policy.clone(),
            desired_rx,
            status_tx,
        })));
        tasks.push(tokio::spawn(run_heartbeat_task(
            config.heartbeat_period,
            Arc::clone(&sensor),
            reporter.clone(),
        )));

        info!(
            "Light controller started (sensed {}, settle {:?}, cutoff {:?})",
            sensor.read(),
            config.policy.settle_delay(),
            config.policy.max_attempts()
        );

        Ok(Self {
            sensor,
            queue,
            reporter,
            topics: config.topics,
            status_rx,
            _tasks: tasks,
        })
    }

    /// Decode an inbound command payload and queue it.
    ///
    /// Malformed payloads are logged and dropped. When the queue is full the
    /// oldest pending command is evicted; the intake path never blocks.
    pub fn on_command_received(&self, payload: &[u8]) -> Option<DesiredState> {
        let desired = match decode_command(payload) {
            Ok(desired) => desired,
            Err(e) => {
                warn!(
                    "Ignoring command {:?}: {}",
                    String::from_utf8_lossy(payload),
                    e
                );
                return None;
            }
        };

        let (cmd, evicted) = self.queue.push(desired);
        debug!("Queued command #{} ({})", cmd.seq, cmd.desired);
        if let Some(old) = evicted {
            warn!(
                "Command queue full, evicted command #{} ({})",
                old.seq, old.desired
            );
        }
        Some(desired)
    }

    /// Bus (re)connected: subscribe to commands, then announce the current state.
    pub async fn on_connected(&self) -> Result<(), BusError> {
        self.reporter.bus().subscribe(&self.topics.command).await?;
        info!("Subscribed to {}", self.topics.command);
        self.reporter.report(self.sensor.read()).await
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn status(&self) -> ConvergenceState {
        *self.status_rx.borrow()
    }

    pub fn sensed(&self) -> SensedState {
        self.sensor.read()
    }

    pub fn reporter(&self) -> &StateReporter {
        &self.reporter
    }

    pub fn queued_commands(&self) -> usize {
        self.queue.len()
    }

    pub fn evicted_commands(&self) -> u64 {
        self.queue.evicted()
    }
}
