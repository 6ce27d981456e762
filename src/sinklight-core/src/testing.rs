// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Test doubles for the hardware and bus seams.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::bus::{BusFuture, MessageBus};
use crate::error::{ActuatorError, BusError, SensorError};
use crate::hw::{ControlLine, EdgeNotifier, LineDirection, Sensor};
use crate::state::{LightState, SensedState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOp {
    Direction(LineDirection),
    Level(bool),
}

/// Control line that records every operation.
pub struct RecordingLine {
    pin: u32,
    ops: Arc<Mutex<Vec<LineOp>>>,
    fail_levels: bool,
}

impl RecordingLine {
    pub fn new(pin: u32) -> Self {
        Self {
            pin,
            ops: Arc::new(Mutex::new(Vec::new())),
            fail_levels: false,
        }
    }

    pub fn fail_level_writes(mut self) -> Self {
        self.fail_levels = true;
        self
    }

    pub fn ops(&self) -> Arc<Mutex<Vec<LineOp>>> {
        Arc::clone(&self.ops)
    }
}

impl ControlLine for RecordingLine {
    fn pin(&self) -> u32 {
        self.pin
    }

    fn set_direction(&mut self, direction: LineDirection) -> Result<(), ActuatorError> {
        self.ops.lock().unwrap().push(LineOp::Direction(direction));
        Ok(())
    }

    fn set_level(&mut self, high: bool) -> Result<(), ActuatorError> {
        if self.fail_levels {
            return Err(ActuatorError::Level {
                pin: self.pin,
                level: if high { "high" } else { "low" },
                reason: "injected".to_string(),
            });
        }
        self.ops.lock().unwrap().push(LineOp::Level(high));
        Ok(())
    }
}

struct FakeLightInner {
    level: bool,
    jammed: bool,
    fail_next_pulses: u32,
    output: bool,
    held_low: bool,
    pulses: u32,
    notifier: Option<EdgeNotifier>,
}

impl FakeLightInner {
    fn flip(&mut self) {
        self.level = !self.level;
        if let Some(notifier) = &self.notifier {
            notifier.notify();
        }
    }
}

/// Relay simulation: a completed low-high pulse flips the light and raises
/// an edge.
#[derive(Clone)]
pub struct FakeLight {
    inner: Arc<Mutex<FakeLightInner>>,
}

impl FakeLight {
    pub fn new(initial: LightState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeLightInner {
                level: initial.level(),
                jammed: false,
                fail_next_pulses: 0,
                output: false,
                held_low: false,
                pulses: 0,
                notifier: None,
            })),
        }
    }

    pub fn sensor(&self) -> FakeSensor {
        FakeSensor {
            light: self.clone(),
        }
    }

    pub fn line(&self) -> FakeLine {
        FakeLine {
            light: self.clone(),
        }
    }

    pub fn state(&self) -> LightState {
        LightState::from_level(self.inner.lock().unwrap().level)
    }

    /// Pulses that reached the relay.
    pub fn pulses(&self) -> u32 {
        self.inner.lock().unwrap().pulses
    }

    /// Flip the light from outside, e.g. a wall switch.
    pub fn external_toggle(&self) {
        self.inner.lock().unwrap().flip();
    }

    /// Whether the control line is currently configured as an output.
    pub fn line_driven(&self) -> bool {
        self.inner.lock().unwrap().output
    }

    pub fn set_jammed(&self, jammed: bool) {
        self.inner.lock().unwrap().jammed = jammed;
    }

    pub fn fail_next_pulses(&self, count: u32) {
        self.inner.lock().unwrap().fail_next_pulses = count;
    }
}

pub struct FakeSensor {
    light: FakeLight,
}

impl Sensor for FakeSensor {
    fn read(&self) -> SensedState {
        SensedState::from_level(self.light.inner.lock().unwrap().level)
    }

    fn on_change(&mut self, notifier: EdgeNotifier) -> Result<(), SensorError> {
        let mut inner = self.light.inner.lock().unwrap();
        if inner.notifier.is_some() {
            return Err(SensorError::AlreadyRegistered { pin: 22 });
        }
        inner.notifier = Some(notifier);
        Ok(())
    }
}

pub struct FakeLine {
    light: FakeLight,
}

impl ControlLine for FakeLine {
    fn pin(&self) -> u32 {
        23
    }

    fn set_direction(&mut self, direction: LineDirection) -> Result<(), ActuatorError> {
        let mut inner = self.light.inner.lock().unwrap();
        inner.output = direction == LineDirection::Output;
        if !inner.output {
            inner.held_low = false;
        }
        Ok(())
    }

    fn set_level(&mut self, high: bool) -> Result<(), ActuatorError> {
        let mut inner = self.light.inner.lock().unwrap();
        if !high && inner.fail_next_pulses > 0 {
            inner.fail_next_pulses -= 1;
            return Err(ActuatorError::Level {
                pin: 23,
                level: "low",
                reason: "injected".to_string(),
            });
        }
        if !inner.output {
            return Ok(());
        }
        if !high {
            inner.held_low = true;
        } else if inner.held_low {
            inner.held_low = false;
            inner.pulses += 1;
            if !inner.jammed {
                inner.flip();
            }
        }
        Ok(())
    }
}

/// Bus that records publishes and subscriptions.
#[derive(Default)]
pub struct RecordingBus {
    publishes: Mutex<Vec<(String, Vec<u8>)>>,
    subscriptions: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_publishes(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }

    /// Published `(topic, state)` pairs in order.
    pub fn published(&self) -> Vec<(String, LightState)> {
        self.publishes
            .lock()
            .unwrap()
            .iter()
            .map(|(topic, payload)| {
                let value: serde_json::Value = serde_json::from_slice(payload).unwrap();
                let state = match value["state"].as_u64() {
                    Some(1) => LightState::On,
                    Some(0) => LightState::Off,
                    other => panic!("unexpected state field {:?}", other),
                };
                (topic.clone(), state)
            })
            .collect()
    }

    pub fn published_states(&self) -> Vec<LightState> {
        self.published().into_iter().map(|(_, s)| s).collect()
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().unwrap().clone()
    }
}

impl MessageBus for RecordingBus {
    fn publish<'a>(&'a self, topic: &'a str, payload: Vec<u8>) -> BusFuture<'a> {
        Box::pin(async move {
            if self.fail.load(Ordering::Relaxed) {
                return Err(BusError::Publish {
                    topic: topic.to_string(),
                    reason: "injected".to_string(),
                });
            }
            self.publishes
                .lock()
                .unwrap()
                .push((topic.to_string(), payload));
            Ok(())
        })
    }

    fn subscribe<'a>(&'a self, topic: &'a str) -> BusFuture<'a> {
        Box::pin(async move {
            self.subscriptions.lock().unwrap().push(topic.to_string());
            Ok(())
        })
    }
}
