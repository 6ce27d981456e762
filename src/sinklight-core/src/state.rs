// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::fmt;

/// Two-valued light level shared by sensed and desired states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightState {
    Off,
    On,
}

impl LightState {
    pub fn from_level(level: bool) -> Self {
        if level {
            Self::On
        } else {
            Self::Off
        }
    }

    pub fn level(self) -> bool {
        matches!(self, Self::On)
    }

    /// Wire value used in the `state` field of bus payloads.
    pub fn as_wire(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::On => 1,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Off => Self::On,
            Self::On => Self::Off,
        }
    }
}

impl fmt::Display for LightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => write!(f, "off"),
            Self::On => write!(f, "on"),
        }
    }
}

/// Level read from the state input.
///
/// Only a [`crate::Sensor`] produces these, and it is the only state the
/// reporter will publish as "current".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SensedState(LightState);

impl SensedState {
    pub fn new(state: LightState) -> Self {
        Self(state)
    }

    pub fn from_level(level: bool) -> Self {
        Self(LightState::from_level(level))
    }

    pub fn state(self) -> LightState {
        self.0
    }
}

impl fmt::Display for SensedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Target state requested over the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DesiredState(LightState);

impl DesiredState {
    pub fn new(state: LightState) -> Self {
        Self(state)
    }

    pub fn state(self) -> LightState {
        self.0
    }

    /// Whether the sensed level already satisfies this target.
    pub fn is_met_by(self, sensed: SensedState) -> bool {
        self.0 == sensed.state()
    }
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Command handed from the bus callback to the intake task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCommand {
    /// Receipt order, assigned by the command queue.
    pub seq: u64,
    pub desired: DesiredState,
}
