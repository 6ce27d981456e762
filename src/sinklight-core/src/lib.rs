// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

pub mod bus;
pub mod controller;
pub mod error;
pub mod hw;
pub mod payload;
pub mod queue;
pub mod reporter;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub type DynResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub use bus::{MessageBus, Topics};
pub use controller::{ControllerConfig, ControllerTasks, LightController};
pub use error::{ActuatorError, BusError, DecodeError, SensorError};
pub use hw::{Actuator, ControlLine, EdgeNotifier, LineDirection, Sensor};
pub use reporter::StateReporter;
pub use state::{DesiredState, LightState, PendingCommand, SensedState};
