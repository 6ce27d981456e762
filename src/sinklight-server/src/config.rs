// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Configuration file support for sinklight-server.
//!
//! Config is loaded from the `[sinklight-server]` section of `sinklight.toml`.
//! Default search order:
//! 1. Path specified via `--config` CLI argument
//! 2. `./sinklight.toml`
//! 3. `~/.config/sinklight/sinklight.toml`
//! 4. `/etc/sinklight/sinklight.toml`

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sinklight_app::ConfigFile;
use sinklight_backend::{GpioAccess, DEFAULT_CTRL_PIN, DEFAULT_STATE_PIN, DEFAULT_SYSFS_ROOT};
use sinklight_core::bus::{DEFAULT_COMMAND_TOPIC, DEFAULT_STATE_TOPIC};
use sinklight_core::controller::{
    ConvergencePolicy, ExponentialBackoff, DEFAULT_HEARTBEAT_PERIOD,
};
use sinklight_core::hw::{Actuator, DEFAULT_EDGE_QUEUE_CAPACITY};
use sinklight_core::queue::DEFAULT_COMMAND_QUEUE_CAPACITY;
use sinklight_core::{ControllerConfig, Topics};

/// Top-level server configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// General settings
    pub general: GeneralConfig,
    /// GPIO backend and pin assignment
    pub gpio: GpioConfig,
    /// Convergence loop tuning
    pub convergence: ConvergenceConfig,
    /// Periodic state report
    pub heartbeat: HeartbeatConfig,
    /// MQTT broker connection and topics
    pub mqtt: MqttConfig,
    /// Session restart behavior
    pub supervisor: SupervisorConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GpioConfig {
    /// Backend name ("sysfs" or "dummy")
    pub backend: String,
    /// Input pin wired to the relay state contact
    pub state_pin: u32,
    /// Open-drain pin wired to the relay toggle input
    pub ctrl_pin: u32,
    /// Pulse width in milliseconds
    pub toggle_interval_ms: u64,
    /// Edge notifications buffered between interrupt and reporter
    pub edge_queue_capacity: usize,
    /// sysfs GPIO class directory
    pub sysfs_root: PathBuf,
    /// Invert the sensed level
    pub active_low: bool,
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            backend: "sysfs".to_string(),
            state_pin: DEFAULT_STATE_PIN,
            ctrl_pin: DEFAULT_CTRL_PIN,
            toggle_interval_ms: Actuator::DEFAULT_TOGGLE_INTERVAL.as_millis() as u64,
            edge_queue_capacity: DEFAULT_EDGE_QUEUE_CAPACITY,
            sysfs_root: PathBuf::from(DEFAULT_SYSFS_ROOT),
            active_low: false,
        }
    }
}

impl GpioConfig {
    pub fn access(&self) -> GpioAccess {
        GpioAccess {
            state_pin: self.state_pin,
            ctrl_pin: self.ctrl_pin,
            sysfs_root: self.sysfs_root.clone(),
            active_low: self.active_low,
        }
    }

    pub fn toggle_interval(&self) -> Duration {
        Duration::from_millis(self.toggle_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceConfig {
    /// Wait after each pulse before re-sampling the sensor
    pub settle_delay_ms: u64,
    /// Give up after this many pulses; unset retries until superseded
    pub max_attempts: Option<u32>,
    /// Pending commands held before the oldest is evicted
    pub command_queue_capacity: usize,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: ConvergencePolicy::DEFAULT_SETTLE_DELAY.as_millis() as u64,
            max_attempts: None,
            command_queue_capacity: DEFAULT_COMMAND_QUEUE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    pub period_secs: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            period_secs: DEFAULT_HEARTBEAT_PERIOD.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker host name or address
    pub host: Option<String>,
    /// Broker port
    pub port: u16,
    /// Client identifier; a random `sinklight-<uuid>` when unset
    pub client_id: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub state_topic: String,
    pub command_topic: String,
    pub keep_alive_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 1883,
            client_id: None,
            username: None,
            password: None,
            state_topic: DEFAULT_STATE_TOPIC.to_string(),
            command_topic: DEFAULT_COMMAND_TOPIC.to_string(),
            keep_alive_secs: 30,
        }
    }
}

impl MqttConfig {
    pub fn topics(&self) -> Topics {
        Topics {
            state: self.state_topic.clone(),
            command: self.command_topic.clone(),
        }
    }

    /// Configured client id, or a fresh random one.
    pub fn resolved_client_id(&self) -> String {
        self.client_id
            .clone()
            .unwrap_or_else(|| format!("sinklight-{}", uuid::Uuid::new_v4().simple()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// First restart delay after a bus disconnect
    pub restart_base_delay_ms: u64,
    /// Upper bound for the restart delay
    pub restart_max_delay_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            restart_base_delay_ms: 1_000,
            restart_max_delay_ms: 30_000,
        }
    }
}

impl SupervisorConfig {
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(
            None,
            Duration::from_millis(self.restart_base_delay_ms),
            Duration::from_millis(self.restart_max_delay_ms),
        )
    }
}

impl ServerConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        validate_log_level(self.general.log_level.as_deref())?;

        if self.gpio.backend.trim().is_empty() {
            return Err("[gpio].backend must not be empty".to_string());
        }
        if self.gpio.state_pin == self.gpio.ctrl_pin {
            return Err("[gpio].state_pin and [gpio].ctrl_pin must differ".to_string());
        }
        if self.gpio.toggle_interval_ms == 0 {
            return Err("[gpio].toggle_interval_ms must be > 0".to_string());
        }
        if self.gpio.edge_queue_capacity == 0 {
            return Err("[gpio].edge_queue_capacity must be > 0".to_string());
        }

        if self.convergence.settle_delay_ms == 0 {
            return Err("[convergence].settle_delay_ms must be > 0".to_string());
        }
        if self.convergence.max_attempts == Some(0) {
            return Err("[convergence].max_attempts must be > 0 when set".to_string());
        }
        if self.convergence.command_queue_capacity == 0 {
            return Err("[convergence].command_queue_capacity must be > 0".to_string());
        }

        if self.heartbeat.period_secs == 0 {
            return Err("[heartbeat].period_secs must be > 0".to_string());
        }

        if let Some(host) = &self.mqtt.host {
            if host.trim().is_empty() {
                return Err("[mqtt].host must not be empty when set".to_string());
            }
        }
        if self.mqtt.port == 0 {
            return Err("[mqtt].port must be > 0".to_string());
        }
        if self.mqtt.password.is_some() && self.mqtt.username.is_none() {
            return Err("[mqtt].password requires [mqtt].username".to_string());
        }
        validate_topic("[mqtt].state_topic", &self.mqtt.state_topic)?;
        validate_topic("[mqtt].command_topic", &self.mqtt.command_topic)?;
        if self.mqtt.state_topic == self.mqtt.command_topic {
            return Err("[mqtt].state_topic and [mqtt].command_topic must differ".to_string());
        }
        if self.mqtt.keep_alive_secs < 5 {
            return Err("[mqtt].keep_alive_secs must be >= 5".to_string());
        }

        if self.supervisor.restart_base_delay_ms == 0 {
            return Err("[supervisor].restart_base_delay_ms must be > 0".to_string());
        }
        if self.supervisor.restart_max_delay_ms < self.supervisor.restart_base_delay_ms {
            return Err(
                "[supervisor].restart_max_delay_ms must be >= restart_base_delay_ms".to_string(),
            );
        }

        Ok(())
    }

    /// Controller tuning derived from the config.
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            policy: ConvergencePolicy::new(
                Duration::from_millis(self.convergence.settle_delay_ms),
                self.convergence.max_attempts,
            ),
            heartbeat_period: Duration::from_secs(self.heartbeat.period_secs),
            command_queue_capacity: self.convergence.command_queue_capacity,
            edge_queue_capacity: self.gpio.edge_queue_capacity,
            topics: self.mqtt.topics(),
        }
    }

    /// Generate an example configuration wrapped under the
    /// `[sinklight-server]` section header.
    pub fn example_toml() -> String {
        #[derive(serde::Serialize)]
        struct Wrapper {
            #[serde(rename = "sinklight-server")]
            inner: ServerConfig,
        }
        let example = ServerConfig {
            general: GeneralConfig {
                log_level: Some("info".to_string()),
            },
            gpio: GpioConfig::default(),
            convergence: ConvergenceConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            mqtt: MqttConfig {
                host: Some("broker.local".to_string()),
                client_id: Some("sinklight".to_string()),
                ..MqttConfig::default()
            },
            supervisor: SupervisorConfig::default(),
        };
        toml::to_string_pretty(&Wrapper { inner: example }).unwrap_or_default()
    }
}

fn validate_log_level(level: Option<&str>) -> Result<(), String> {
    if let Some(level) = level {
        match level {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(format!(
                    "[general].log_level '{}' is invalid (expected one of: trace, debug, info, warn, error)",
                    level
                ))
            }
        }
    }
    Ok(())
}

/// Topics are matched literally when routing, so filters are rejected.
fn validate_topic(key: &str, topic: &str) -> Result<(), String> {
    if topic.is_empty() {
        return Err(format!("{} must not be empty", key));
    }
    if topic.contains('+') || topic.contains('#') {
        return Err(format!("{} '{}' must not contain wildcards", key, topic));
    }
    Ok(())
}

impl ConfigFile for ServerConfig {
    fn section_key() -> &'static str {
        "sinklight-server"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.gpio.backend, "sysfs");
        assert_eq!(config.gpio.state_pin, 22);
        assert_eq!(config.gpio.ctrl_pin, 23);
        assert_eq!(config.gpio.toggle_interval_ms, 200);
        assert_eq!(config.convergence.settle_delay_ms, 500);
        assert_eq!(config.convergence.max_attempts, None);
        assert_eq!(config.heartbeat.period_secs, 60);
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.state_topic, "home/hillstate/sinklight/state");
        assert_eq!(config.mqtt.command_topic, "home/hillstate/sinklight/command");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml_str = r#"
[gpio]
backend = "dummy"

[mqtt]
host = "10.0.0.2"
port = 8123
"#;

        let config: ServerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.gpio.backend, "dummy");
        assert_eq!(config.gpio.state_pin, 22);
        assert_eq!(config.mqtt.host.as_deref(), Some("10.0.0.2"));
        assert_eq!(config.mqtt.port, 8123);
        assert_eq!(config.mqtt.keep_alive_secs, 30);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[general]
log_level = "debug"

[gpio]
backend = "sysfs"
state_pin = 5
ctrl_pin = 6
toggle_interval_ms = 150
edge_queue_capacity = 4
sysfs_root = "/tmp/gpio"
active_low = true

[convergence]
settle_delay_ms = 750
max_attempts = 20
command_queue_capacity = 3

[heartbeat]
period_secs = 30

[mqtt]
host = "broker"
client_id = "kitchen"
username = "light"
password = "secret"
state_topic = "kitchen/light/state"
command_topic = "kitchen/light/set"
keep_alive_secs = 15

[supervisor]
restart_base_delay_ms = 250
restart_max_delay_ms = 8000
"#;

        let config: ServerConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_ok());

        let controller = config.controller_config();
        assert_eq!(controller.policy.settle_delay(), Duration::from_millis(750));
        assert_eq!(controller.heartbeat_period, Duration::from_secs(30));
        assert_eq!(controller.command_queue_capacity, 3);
        assert_eq!(controller.edge_queue_capacity, 4);
        assert_eq!(controller.topics.command, "kitchen/light/set");

        let access = config.gpio.access();
        assert_eq!(access.state_pin, 5);
        assert_eq!(access.sysfs_root, PathBuf::from("/tmp/gpio"));
        assert!(access.active_low);
        assert_eq!(config.mqtt.resolved_client_id(), "kitchen");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ServerConfig::default();
        config.general.log_level = Some("loud".to_string());
        assert!(config.validate().unwrap_err().contains("log_level"));

        let mut config = ServerConfig::default();
        config.gpio.ctrl_pin = config.gpio.state_pin;
        assert!(config.validate().unwrap_err().contains("ctrl_pin"));

        let mut config = ServerConfig::default();
        config.convergence.max_attempts = Some(0);
        assert!(config.validate().unwrap_err().contains("max_attempts"));

        let mut config = ServerConfig::default();
        config.mqtt.state_topic = "home/+/state".to_string();
        assert!(config.validate().unwrap_err().contains("wildcards"));

        let mut config = ServerConfig::default();
        config.mqtt.password = Some("secret".to_string());
        assert!(config.validate().unwrap_err().contains("username"));

        let mut config = ServerConfig::default();
        config.supervisor.restart_max_delay_ms = 10;
        assert!(config.validate().unwrap_err().contains("restart_max_delay_ms"));
    }

    #[test]
    fn test_command_topic_filters_rejected() {
        for filter in ["home/+/command", "home/sinklight/#", "#"] {
            let mut config = ServerConfig::default();
            config.mqtt.command_topic = filter.to_string();
            let err = config.validate().unwrap_err();
            assert!(err.contains("[mqtt].command_topic"), "{}", err);
            assert!(err.contains("wildcards"), "{}", err);
        }

        // Whatever passes validation routes inbound publishes on that exact topic
        let mut config = ServerConfig::default();
        config.mqtt.command_topic = "home/kitchen/command".to_string();
        assert!(config.validate().is_ok());
        let topics = config.controller_config().topics;
        assert!(topics.is_command("home/kitchen/command"));
        assert!(!topics.is_command("home/hall/command"));
    }

    #[test]
    fn test_random_client_id() {
        let mqtt = MqttConfig::default();
        let id = mqtt.resolved_client_id();
        assert!(id.starts_with("sinklight-"));
        assert_ne!(id, mqtt.resolved_client_id());
    }

    #[test]
    fn test_example_toml_parses() {
        let example = ServerConfig::example_toml();
        let table: toml::Table = toml::from_str(&example).unwrap();
        let section = table.get("sinklight-server").unwrap();
        let config: ServerConfig = toml::from_str(&toml::to_string(section).unwrap()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.mqtt.host.as_deref(), Some("broker.local"));
    }
}
