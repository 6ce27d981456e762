// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::bus::MessageBus;
use crate::error::BusError;
use crate::payload::encode_state;
use crate::state::SensedState;

/// Publishes sensed state on the state topic.
///
/// Best-effort: failures are returned for the caller to log and the next
/// trigger simply tries again.
#[derive(Clone)]
pub struct StateReporter {
    bus: Arc<dyn MessageBus>,
    topic: String,
    published: Arc<AtomicU64>,
}

impl StateReporter {
    pub fn new(bus: Arc<dyn MessageBus>, topic: impl Into<String>) -> Self {
        Self {
            bus,
            topic: topic.into(),
            published: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn bus(&self) -> &Arc<dyn MessageBus> {
        &self.bus
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Successful publishes so far.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub async fn report(&self, state: SensedState) -> Result<(), BusError> {
        self.bus.publish(&self.topic, encode_state(state)).await?;
        self.published.fetch_add(1, Ordering::Relaxed);
        debug!("Reported state {} on {}", state, self.topic);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::LightState;
    use crate::testing::RecordingBus;

    #[tokio::test]
    async fn test_report_publishes_state_field() {
        let bus = Arc::new(RecordingBus::new());
        let reporter = StateReporter::new(bus.clone(), "light/state");

        reporter
            .report(SensedState::new(LightState::On))
            .await
            .expect("report");

        assert_eq!(
            bus.published(),
            vec![("light/state".to_string(), LightState::On)]
        );
        assert_eq!(reporter.published(), 1);
    }

    #[tokio::test]
    async fn test_report_failure_is_returned() {
        let bus = Arc::new(RecordingBus::new());
        bus.fail_publishes(true);
        let reporter = StateReporter::new(bus.clone(), "light/state");

        let err = reporter
            .report(SensedState::new(LightState::Off))
            .await
            .unwrap_err();
        assert!(matches!(err, BusError::Publish { .. }));
        assert_eq!(reporter.published(), 0);
        assert!(bus.published().is_empty());
    }
}
