// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

mod config;
mod mqtt;
mod session;
mod supervisor;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use sinklight_app::{init_logging, normalize_name, parse_broker_addr, ConfigFile};
use sinklight_backend::{register_builtin_backends_on, RegistrationContext};
use sinklight_core::DynResult;

use config::ServerConfig;
use mqtt::MqttEndpoint;
use session::SessionConfig;

const PKG_DESCRIPTION: &str = concat!(env!("CARGO_PKG_NAME"), " - relay light controller");

#[derive(Debug, Parser)]
#[command(
    author = env!("CARGO_PKG_AUTHORS"),
    version = env!("CARGO_PKG_VERSION"),
    about = PKG_DESCRIPTION,
)]
struct Cli {
    /// Path to configuration file
    #[arg(long = "config", short = 'C', value_name = "FILE")]
    config: Option<PathBuf>,
    /// Print example configuration and exit
    #[arg(long = "print-config")]
    print_config: bool,
    /// GPIO backend to use (e.g. sysfs, dummy)
    #[arg(short = 'b', long = "backend")]
    backend: Option<String>,
    /// MQTT broker as <host>[:<port>]
    #[arg(short = 'm', long = "broker", value_name = "HOST[:PORT]")]
    broker: Option<String>,
    /// MQTT client identifier
    #[arg(long = "client-id")]
    client_id: Option<String>,
}

fn resolve_config(
    cli: &Cli,
    cfg: &ServerConfig,
    registry: &RegistrationContext,
) -> DynResult<SessionConfig> {
    let backend = normalize_name(cli.backend.as_deref().unwrap_or(&cfg.gpio.backend));
    if !registry.is_backend_registered(&backend) {
        return Err(format!(
            "Unknown GPIO backend: {} (available: {})",
            backend,
            registry.registered_backends().join(", ")
        )
        .into());
    }

    let (host, port) = match (&cli.broker, &cfg.mqtt.host) {
        (Some(addr), _) => parse_broker_addr(addr, cfg.mqtt.port)?,
        (None, Some(host)) => (host.clone(), cfg.mqtt.port),
        (None, None) => {
            return Err(
                "MQTT broker not specified. Use --broker or set [mqtt].host in config.".into(),
            )
        }
    };

    let client_id = match &cli.client_id {
        Some(id) if !id.trim().is_empty() => id.clone(),
        Some(_) => return Err("--client-id must not be empty".into()),
        None => cfg.mqtt.resolved_client_id(),
    };

    let mut server = cfg.clone();
    server.gpio.backend = backend.clone();

    Ok(SessionConfig {
        backend,
        endpoint: MqttEndpoint {
            host,
            port,
            client_id,
            username: cfg.mqtt.username.clone(),
            password: cfg.mqtt.password.clone(),
            keep_alive: Duration::from_secs(cfg.mqtt.keep_alive_secs),
        },
        server,
    })
}

#[tokio::main]
async fn main() -> DynResult<()> {
    let mut registry = RegistrationContext::new();
    register_builtin_backends_on(&mut registry);

    let cli = Cli::parse();

    if cli.print_config {
        println!("{}", ServerConfig::example_toml());
        return Ok(());
    }

    let (cfg, config_path) = if let Some(ref path) = cli.config {
        let cfg = ServerConfig::load_from_file(path)?;
        (cfg, Some(path.clone()))
    } else {
        ServerConfig::load_from_default_paths()?
    };
    cfg.validate()
        .map_err(|e| format!("Invalid server configuration: {}", e))?;

    init_logging(cfg.general.log_level.as_deref());

    if let Some(ref path) = config_path {
        info!("Loaded configuration from {}", path.display());
    }

    let resolved = resolve_config(&cli, &cfg, &registry)?;

    info!(
        "Starting sinklight-server {} (built {}, backend: {}, state gpio{}, control gpio{})",
        env!("CARGO_PKG_VERSION"),
        env!("SINKLIGHT_SERVER_BUILD_DATE"),
        resolved.backend,
        resolved.server.gpio.state_pin,
        resolved.server.gpio.ctrl_pin
    );

    let resolved = &resolved;
    let registry = &registry;
    supervisor::supervise(cfg.supervisor.backoff(), move |connected_tx| {
        session::run_session(resolved, registry, connected_tx)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> RegistrationContext {
        let mut registry = RegistrationContext::new();
        register_builtin_backends_on(&mut registry);
        registry
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "sinklight-server",
            "-b",
            "Dummy",
            "-m",
            "10.0.0.9:8123",
            "--client-id",
            "sink",
        ]);
        let mut cfg = ServerConfig::default();
        cfg.mqtt.host = Some("broker.local".to_string());

        let resolved = resolve_config(&cli, &cfg, &registry()).unwrap();
        assert_eq!(resolved.backend, "dummy");
        assert_eq!(resolved.server.gpio.backend, "dummy");
        assert_eq!(resolved.endpoint.host, "10.0.0.9");
        assert_eq!(resolved.endpoint.port, 8123);
        assert_eq!(resolved.endpoint.client_id, "sink");
    }

    #[test]
    fn test_config_used_without_cli() {
        let cli = Cli::parse_from(["sinklight-server"]);
        let mut cfg = ServerConfig::default();
        cfg.gpio.backend = "dummy".to_string();
        cfg.mqtt.host = Some("broker.local".to_string());

        let resolved = resolve_config(&cli, &cfg, &registry()).unwrap();
        assert_eq!(resolved.endpoint.host, "broker.local");
        assert_eq!(resolved.endpoint.port, 1883);
        assert!(resolved.endpoint.client_id.starts_with("sinklight-"));
    }

    #[test]
    fn test_missing_broker_is_an_error() {
        let cli = Cli::parse_from(["sinklight-server", "-b", "dummy"]);
        let err = resolve_config(&cli, &ServerConfig::default(), &registry())
            .err()
            .unwrap();
        assert!(err.to_string().contains("MQTT broker not specified"));
    }

    #[test]
    fn test_unknown_backend_is_an_error() {
        let cli = Cli::parse_from(["sinklight-server", "-b", "pigpio", "-m", "broker"]);
        let err = resolve_config(&cli, &ServerConfig::default(), &registry())
            .err()
            .unwrap();
        assert!(err.to_string().starts_with("Unknown GPIO backend: pigpio"));
    }
}
