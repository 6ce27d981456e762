// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Convergence state machine.
//!
//! Tracks whether a command is still being worked towards, and how many
//! toggle attempts it has taken so far. The attempt counter is diagnostic
//! only; the loop itself decides when to stop.

use std::fmt;
use std::time::{Duration, Instant};

use crate::state::{DesiredState, LightState, SensedState};

/// Events that drive the convergence machine.
#[derive(Debug, Clone, Copy)]
pub enum ConvergenceEvent {
    /// A command was accepted (or superseded the current target).
    TargetSet {
        target: DesiredState,
        sensed: SensedState,
    },
    /// A toggle pulse was attempted for the current target.
    Attempted,
    /// The sensed level matched the target.
    Matched,
    /// The configured attempt cutoff was reached without a match.
    CutoffReached,
}

/// Observable convergence state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConvergenceState {
    /// No outstanding command.
    #[default]
    Idle,
    /// Retry loop active.
    Converging { target: LightState, attempts: u32 },
    /// Gave up after the attempt cutoff; waits for the next command.
    Stalled { target: LightState, attempts: u32 },
}

impl fmt::Display for ConvergenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Converging { target, attempts } => {
                write!(f, "Converging(to {}, {} attempts)", target, attempts)
            }
            Self::Stalled { target, attempts } => {
                write!(f, "Stalled(to {}, {} attempts)", target, attempts)
            }
        }
    }
}

impl ConvergenceState {
    pub fn is_converging(&self) -> bool {
        matches!(self, Self::Converging { .. })
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Converging { attempts, .. } | Self::Stalled { attempts, .. } => *attempts,
            Self::Idle => 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConvergenceMachine {
    state: ConvergenceState,
    transition_count: u64,
    last_transition: Option<Instant>,
}

impl Default for ConvergenceMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ConvergenceMachine {
    pub fn new() -> Self {
        Self {
            state: ConvergenceState::Idle,
            transition_count: 0,
            last_transition: None,
        }
    }

    pub fn state(&self) -> &ConvergenceState {
        &self.state
    }

    pub fn transition_count(&self) -> u64 {
        self.transition_count
    }

    pub fn time_in_state(&self) -> Option<Duration> {
        self.last_transition.map(|t| t.elapsed())
    }

    /// Process an event. Returns true if a transition occurred.
    pub fn process_event(&mut self, event: ConvergenceEvent) -> bool {
        match self.next_state(event) {
            Some(state) => {
                self.state = state;
                self.transition_count += 1;
                self.last_transition = Some(Instant::now());
                true
            }
            None => false,
        }
    }

    fn next_state(&self, event: ConvergenceEvent) -> Option<ConvergenceState> {
        match (self.state, event) {
            // Supersede in place; the attempt count carries over
            (
                ConvergenceState::Converging { attempts, .. },
                ConvergenceEvent::TargetSet { target, sensed },
            ) => {
                if target.is_met_by(sensed) {
                    Some(ConvergenceState::Idle)
                } else {
                    Some(ConvergenceState::Converging {
                        target: target.state(),
                        attempts,
                    })
                }
            }

            // From Idle or Stalled
            (current, ConvergenceEvent::TargetSet { target, sensed }) => {
                if !target.is_met_by(sensed) {
                    Some(ConvergenceState::Converging {
                        target: target.state(),
                        attempts: 0,
                    })
                } else if current.is_idle() {
                    None
                } else {
                    Some(ConvergenceState::Idle)
                }
            }

            (ConvergenceState::Converging { target, attempts }, ConvergenceEvent::Attempted) => {
                Some(ConvergenceState::Converging {
                    target,
                    attempts: attempts.saturating_add(1),
                })
            }
            (ConvergenceState::Converging { .. }, ConvergenceEvent::Matched) => {
                Some(ConvergenceState::Idle)
            }
            (
                ConvergenceState::Converging { target, attempts },
                ConvergenceEvent::CutoffReached,
            ) => Some(ConvergenceState::Stalled { target, attempts }),

            _ => None,
        }
    }
}
