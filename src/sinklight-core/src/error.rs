// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Error taxonomy for the light controller.
//!
//! Hardware-adjacent errors surface from the narrow components that detect
//! them; only the convergence loop decides what to do with an
//! [`ActuatorError`] (it always retries).

use thiserror::Error;

/// State input could not be brought up. Fatal to device initialization.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("failed to configure state input {pin}: {reason}")]
    Configure { pin: u32, reason: String },

    #[error("failed to read state input {pin}: {reason}")]
    Read { pin: u32, reason: String },

    #[error("edge notifications already registered for state input {pin}")]
    AlreadyRegistered { pin: u32 },
}

/// Control line could not be configured or written.
#[derive(Debug, Clone, Error)]
pub enum ActuatorError {
    #[error("failed to set control line {pin} direction to {direction}: {reason}")]
    Direction {
        pin: u32,
        direction: &'static str,
        reason: String,
    },

    #[error("failed to drive control line {pin} {level}: {reason}")]
    Level {
        pin: u32,
        level: &'static str,
        reason: String,
    },
}

/// Inbound command payload was not `{"state": 0|1}`.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed command payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("command state {0} out of range (expected 0 or 1)")]
    OutOfRange(serde_json::Number),
}

/// Message bus failures.
#[derive(Debug, Clone, Error)]
pub enum BusError {
    #[error("publish to {topic} failed: {reason}")]
    Publish { topic: String, reason: String },

    #[error("subscribe to {topic} failed: {reason}")]
    Subscribe { topic: String, reason: String },

    #[error("message bus disconnected")]
    Disconnected,
}
