// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Bounded command hand-off from the bus callback to the intake task.
//!
//! The bus callback must never wait, so `push` is synchronous. When the queue
//! is full the oldest pending command is evicted: with last-write-wins
//! semantics the newest command is the one that matters.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Notify;

use crate::state::{DesiredState, PendingCommand};

pub const DEFAULT_COMMAND_QUEUE_CAPACITY: usize = 10;

#[derive(Debug)]
struct Shared {
    capacity: usize,
    pending: Mutex<VecDeque<PendingCommand>>,
    notify: Notify,
    next_seq: AtomicU64,
    evicted: AtomicU64,
}

/// Cloneable handle to a drop-oldest command queue.
#[derive(Debug, Clone)]
pub struct CommandQueue {
    shared: Arc<Shared>,
}

impl CommandQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                capacity: capacity.max(1),
                pending: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
                notify: Notify::new(),
                next_seq: AtomicU64::new(0),
                evicted: AtomicU64::new(0),
            }),
        }
    }

    /// Enqueue a command. Returns the evicted command when the queue was full.
    pub fn push(&self, desired: DesiredState) -> (PendingCommand, Option<PendingCommand>) {
        let cmd = PendingCommand {
            seq: self.shared.next_seq.fetch_add(1, Ordering::Relaxed),
            desired,
        };
        let evicted = {
            let mut pending = self
                .shared
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let evicted = if pending.len() >= self.shared.capacity {
                pending.pop_front()
            } else {
                None
            };
            pending.push_back(cmd);
            evicted
        };
        if evicted.is_some() {
            self.shared.evicted.fetch_add(1, Ordering::Relaxed);
        }
        self.shared.notify.notify_one();
        (cmd, evicted)
    }

    /// Take the oldest pending command without waiting.
    pub fn try_pop(&self) -> Option<PendingCommand> {
        self.shared
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    /// Wait for the next command in receipt order.
    pub async fn pop(&self) -> PendingCommand {
        loop {
            if let Some(cmd) = self.try_pop() {
                return cmd;
            }
            self.shared.notify.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.shared
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total commands evicted by overflow.
    pub fn evicted(&self) -> u64 {
        self.shared.evicted.load(Ordering::Relaxed)
    }
}
