// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! MQTT transport for the light controller.
//!
//! Reports go out at QoS 1 (not retained); the command subscription is QoS 0.
//! The event loop is the session's connection watchdog: any disconnect or
//! connection error ends it.

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS,
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use sinklight_core::bus::BusFuture;
use sinklight_core::{BusError, LightController, MessageBus};

use crate::supervisor::SessionFault;

const REQUEST_CHANNEL_CAPACITY: usize = 10;

/// Broker endpoint and client identity for one session.
#[derive(Debug, Clone)]
pub struct MqttEndpoint {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive: Duration,
}

impl MqttEndpoint {
    pub fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);
        if let Some(username) = &self.username {
            options.set_credentials(username, self.password.as_deref().unwrap_or(""));
        }
        options
    }
}

/// [`MessageBus`] over a rumqttc client.
#[derive(Clone)]
pub struct MqttBus {
    client: AsyncClient,
}

impl MqttBus {
    /// Create the client; nothing is sent until the event loop is polled.
    pub fn connect(endpoint: &MqttEndpoint) -> (Self, EventLoop) {
        let (client, eventloop) = AsyncClient::new(endpoint.options(), REQUEST_CHANNEL_CAPACITY);
        (Self { client }, eventloop)
    }

    /// Best-effort clean disconnect.
    pub async fn disconnect(&self) {
        if let Err(e) = self.client.disconnect().await {
            debug!("MQTT disconnect request failed: {}", e);
        }
    }
}

impl MessageBus for MqttBus {
    fn publish<'a>(&'a self, topic: &'a str, payload: Vec<u8>) -> BusFuture<'a> {
        Box::pin(async move {
            self.client
                .publish(topic, QoS::AtLeastOnce, false, payload)
                .await
                .map_err(|e| BusError::Publish {
                    topic: topic.to_string(),
                    reason: e.to_string(),
                })
        })
    }

    fn subscribe<'a>(&'a self, topic: &'a str) -> BusFuture<'a> {
        Box::pin(async move {
            self.client
                .subscribe(topic, QoS::AtMostOnce)
                .await
                .map_err(|e| BusError::Subscribe {
                    topic: topic.to_string(),
                    reason: e.to_string(),
                })
        })
    }
}

/// Drive the MQTT connection until it drops.
///
/// On every ConnAck the controller subscribes and announces its state; inbound
/// publishes on the command topic are handed to the controller. Returns the
/// fault that ended the connection.
pub async fn run_event_loop(
    mut eventloop: EventLoop,
    controller: Arc<LightController>,
    connected_tx: watch::Sender<bool>,
) -> SessionFault {
    let (fault_tx, mut fault_rx) = mpsc::channel::<BusError>(1);
    let mut on_connected = None;

    let fault = loop {
        tokio::select! {
            Some(err) = fault_rx.recv() => break SessionFault::Bus(err),
            event = eventloop.poll() => match event {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code != ConnectReturnCode::Success {
                        break SessionFault::BusDisconnected(format!(
                            "connection refused: {:?}",
                            ack.code
                        ));
                    }
                    info!("MQTT connected");
                    connected_tx.send_replace(true);
                    let controller = Arc::clone(&controller);
                    let fault_tx = fault_tx.clone();
                    on_connected = Some(tokio::spawn(async move {
                        match controller.on_connected().await {
                            Ok(()) => {}
                            Err(e @ BusError::Subscribe { .. }) => {
                                let _ = fault_tx.send(e).await;
                            }
                            Err(e) => warn!("Initial state report failed: {}", e),
                        }
                    }));
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    if controller.topics().is_command(&publish.topic) {
                        controller.on_command_received(&publish.payload);
                    } else {
                        debug!("Ignoring message on {}", publish.topic);
                    }
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    break SessionFault::BusDisconnected("broker sent disconnect".to_string());
                }
                Ok(_) => {}
                Err(e) => break SessionFault::BusDisconnected(e.to_string()),
            },
        }
    };

    if let Some(handle) = on_connected {
        handle.abort();
    }
    fault
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> MqttEndpoint {
        MqttEndpoint {
            host: "broker.local".to_string(),
            port: 8123,
            client_id: "sinklight-test".to_string(),
            username: Some("light".to_string()),
            password: None,
            keep_alive: Duration::from_secs(30),
        }
    }

    #[test]
    fn test_options_from_endpoint() {
        let options = endpoint().options();
        assert_eq!(
            options.broker_address(),
            ("broker.local".to_string(), 8123)
        );
        assert_eq!(options.client_id(), "sinklight-test");
        assert_eq!(options.keep_alive(), Duration::from_secs(30));
        assert!(options.clean_session());
    }

    #[tokio::test]
    async fn test_publish_fails_without_event_loop() {
        let (bus, eventloop) = MqttBus::connect(&endpoint());
        drop(eventloop);

        let err = bus
            .publish("home/hillstate/sinklight/state", b"{\"state\":1}".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, BusError::Publish { .. }));
    }

    #[tokio::test]
    async fn test_requests_queue_while_disconnected() {
        let (bus, _eventloop) = MqttBus::connect(&endpoint());
        bus.subscribe("home/hillstate/sinklight/command")
            .await
            .unwrap();
        bus.publish("home/hillstate/sinklight/state", b"{\"state\":0}".to_vec())
            .await
            .unwrap();
    }
}
