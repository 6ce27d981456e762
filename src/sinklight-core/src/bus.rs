// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::BusError;

/// Alias to reduce type complexity in MessageBus.
pub type BusFuture<'a> = Pin<Box<dyn Future<Output = Result<(), BusError>> + Send + 'a>>;

pub const DEFAULT_STATE_TOPIC: &str = "home/hillstate/sinklight/state";
pub const DEFAULT_COMMAND_TOPIC: &str = "home/hillstate/sinklight/command";

/// Pub/sub transport the controller reports through.
///
/// Connection management belongs to the implementation; the controller only
/// publishes and subscribes once told the link is up.
pub trait MessageBus: Send + Sync {
    fn publish<'a>(&'a self, topic: &'a str, payload: Vec<u8>) -> BusFuture<'a>;

    fn subscribe<'a>(&'a self, topic: &'a str) -> BusFuture<'a>;
}

/// Topic names for the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topics {
    /// Outbound `{"state": 0|1}` reports.
    pub state: String,
    /// Inbound `{"state": 0|1}` commands.
    pub command: String,
}

impl Default for Topics {
    fn default() -> Self {
        Self {
            state: DEFAULT_STATE_TOPIC.to_string(),
            command: DEFAULT_COMMAND_TOPIC.to_string(),
        }
    }
}

impl Topics {
    pub fn is_command(&self, topic: &str) -> bool {
        topic == self.command
    }
}
