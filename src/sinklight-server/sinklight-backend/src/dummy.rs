// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Dummy light backend for development and testing.
//!
//! Simulates a latching relay in memory: a low-then-high pulse on the control
//! line while it is driven as output flips the light and raises an edge.
//! No GPIO hardware required.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sinklight_core::error::{ActuatorError, SensorError};
use sinklight_core::hw::{ControlLine, EdgeNotifier, LineDirection, Sensor};
use sinklight_core::{LightState, SensedState};
use tracing::debug;

struct RelayState {
    light: LightState,
    direction: LineDirection,
    held_low: bool,
    toggles: u64,
    notifier: Option<EdgeNotifier>,
}

impl RelayState {
    fn flip(&mut self) {
        self.light = self.light.toggled();
        self.toggles += 1;
        debug!("Dummy relay toggled, light now {}", self.light);
        if let Some(notifier) = &self.notifier {
            notifier.notify();
        }
    }
}

#[derive(Clone)]
pub struct DummyRelay {
    state_pin: u32,
    ctrl_pin: u32,
    inner: Arc<Mutex<RelayState>>,
}

impl DummyRelay {
    pub fn new(state_pin: u32, ctrl_pin: u32) -> Self {
        Self {
            state_pin,
            ctrl_pin,
            inner: Arc::new(Mutex::new(RelayState {
                light: LightState::Off,
                direction: LineDirection::Input,
                held_low: false,
                toggles: 0,
                notifier: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RelayState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn sensor(&self) -> DummySensor {
        DummySensor {
            relay: self.clone(),
        }
    }

    pub fn line(&self) -> DummyLine {
        DummyLine {
            relay: self.clone(),
        }
    }

    pub fn light(&self) -> LightState {
        self.lock().light
    }

    /// Flip the light as a wall switch would.
    pub fn toggle_externally(&self) {
        self.lock().flip();
    }

    /// Relay toggles so far, external ones included.
    pub fn toggles(&self) -> u64 {
        self.lock().toggles
    }
}

pub struct DummySensor {
    relay: DummyRelay,
}

impl Sensor for DummySensor {
    fn read(&self) -> SensedState {
        SensedState::new(self.relay.light())
    }

    fn on_change(&mut self, notifier: EdgeNotifier) -> Result<(), SensorError> {
        let mut inner = self.relay.lock();
        if inner.notifier.is_some() {
            return Err(SensorError::AlreadyRegistered {
                pin: self.relay.state_pin,
            });
        }
        inner.notifier = Some(notifier);
        Ok(())
    }
}

pub struct DummyLine {
    relay: DummyRelay,
}

impl ControlLine for DummyLine {
    fn pin(&self) -> u32 {
        self.relay.ctrl_pin
    }

    fn set_direction(&mut self, direction: LineDirection) -> Result<(), ActuatorError> {
        let mut inner = self.relay.lock();
        inner.direction = direction;
        if direction == LineDirection::Input {
            inner.held_low = false;
        }
        Ok(())
    }

    fn set_level(&mut self, high: bool) -> Result<(), ActuatorError> {
        let mut inner = self.relay.lock();
        if inner.direction != LineDirection::Output {
            // Floating input; writes have no effect on the relay
            return Ok(());
        }
        if !high {
            inner.held_low = true;
        } else if inner.held_low {
            inner.held_low = false;
            inner.flip();
        }
        Ok(())
    }
}
