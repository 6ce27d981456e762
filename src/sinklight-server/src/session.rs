// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! One device session: hardware bring-up, broker client, controller tasks
//! and the MQTT event loop.

use std::sync::Arc;

use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};

use sinklight_backend::RegistrationContext;
use sinklight_core::{Actuator, LightController, MessageBus};

use crate::config::ServerConfig;
use crate::mqtt::{self, MqttBus, MqttEndpoint};
use crate::supervisor::SessionFault;

/// Configuration after merging the config file and CLI arguments.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub backend: String,
    pub endpoint: MqttEndpoint,
    pub server: ServerConfig,
}

/// Run a single session until Ctrl+C (`Ok`) or a fault.
///
/// Everything the session created is dropped on return, which aborts the
/// controller tasks and releases the GPIO lines.
pub async fn run_session(
    config: &SessionConfig,
    registry: &RegistrationContext,
    connected_tx: watch::Sender<bool>,
) -> Result<(), SessionFault> {
    let hardware = registry
        .build_hardware(&config.backend, &config.server.gpio.access())
        .map_err(|e| SessionFault::Hardware(e.to_string()))?;

    let (bus, eventloop) = MqttBus::connect(&config.endpoint);
    let bus = Arc::new(bus);
    let actuator = Actuator::new(hardware.line, config.server.gpio.toggle_interval());
    let controller = LightController::start(
        config.server.controller_config(),
        hardware.sensor,
        actuator,
        Arc::clone(&bus) as Arc<dyn MessageBus>,
    )
    .map_err(|e| SessionFault::Hardware(e.to_string()))?;
    let controller = Arc::new(controller);

    info!(
        "Connecting to MQTT broker {}:{} as {}",
        config.endpoint.host, config.endpoint.port, config.endpoint.client_id
    );

    let result = tokio::select! {
        fault = mqtt::run_event_loop(eventloop, Arc::clone(&controller), connected_tx) => Err(fault),
        res = signal::ctrl_c() => {
            match res {
                Ok(()) => info!("Ctrl+C received, shutting down"),
                Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
            }
            bus.disconnect().await;
            Ok(())
        }
    };

    info!(
        "Session finished ({} reports published, {} commands evicted)",
        controller.reporter().published(),
        controller.evicted_commands()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn session_config(backend: &str) -> SessionConfig {
        SessionConfig {
            backend: backend.to_string(),
            endpoint: MqttEndpoint {
                host: "127.0.0.1".to_string(),
                port: 1,
                client_id: "sinklight-test".to_string(),
                username: None,
                password: None,
                keep_alive: Duration::from_secs(30),
            },
            server: ServerConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_unknown_backend_is_a_hardware_fault() {
        let registry = RegistrationContext::new();
        let (tx, rx) = watch::channel(false);

        let result = run_session(&session_config("dummy"), &registry, tx).await;

        assert!(matches!(result, Err(SessionFault::Hardware(_))));
        assert!(!*rx.borrow());
    }

    #[tokio::test]
    async fn test_unreachable_broker_is_a_disconnect() {
        let mut registry = RegistrationContext::new();
        sinklight_backend::register_builtin_backends_on(&mut registry);
        let (tx, rx) = watch::channel(false);

        let result = run_session(&session_config("dummy"), &registry, tx).await;

        assert!(matches!(result, Err(SessionFault::BusDisconnected(_))));
        assert!(!*rx.borrow());
    }
}
