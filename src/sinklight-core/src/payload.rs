// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Codec for the single-field `{"state": 0|1}` payload.

use serde::Deserialize;
use serde_json::Number;

use crate::error::DecodeError;
use crate::state::{DesiredState, LightState, SensedState};

#[derive(Debug, Deserialize)]
struct StatePayload {
    state: Number,
}

/// Decode an inbound command payload.
///
/// Unknown extra fields are ignored; `state` must be a number equal to 0 or
/// 1, so `1.0` is accepted the same as `1`.
pub fn decode_command(payload: &[u8]) -> Result<DesiredState, DecodeError> {
    let parsed: StatePayload = serde_json::from_slice(payload)?;
    let state = match parsed.state.as_f64() {
        Some(v) if v == 0.0 => LightState::Off,
        Some(v) if v == 1.0 => LightState::On,
        _ => return Err(DecodeError::OutOfRange(parsed.state)),
    };
    Ok(DesiredState::new(state))
}

/// Encode a state report.
pub fn encode_state(state: SensedState) -> Vec<u8> {
    serde_json::json!({ "state": state.state().as_wire() })
        .to_string()
        .into_bytes()
}
