// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

/// Normalize a name to lowercase alphanumeric.
pub fn normalize_name(name: &str) -> String {
    name.to_ascii_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Parse a `host[:port]` broker address, using `default_port` when the port
/// is omitted.
pub fn parse_broker_addr(addr: &str, default_port: u16) -> Result<(String, u16), String> {
    let addr = addr.trim();
    let (host, port) = match addr.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .map_err(|e| format!("invalid broker port '{}': {}", port, e))?;
            (host, port)
        }
        None => (addr, default_port),
    };
    if host.is_empty() {
        return Err(format!("missing broker host in '{}'", addr));
    }
    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("SysFS"), "sysfs");
        assert_eq!(normalize_name("dummy-relay"), "dummyrelay");
        assert_eq!(normalize_name("gpio_sysfs"), "gpiosysfs");
    }

    #[test]
    fn test_parse_broker_addr() {
        assert_eq!(
            parse_broker_addr("broker.lan", 1883),
            Ok(("broker.lan".to_string(), 1883))
        );
        assert_eq!(
            parse_broker_addr("10.0.0.5:8123", 1883),
            Ok(("10.0.0.5".to_string(), 8123))
        );
        assert!(parse_broker_addr(":1883", 1883).is_err());
        assert!(parse_broker_addr("host:port", 1883).is_err());
        assert!(parse_broker_addr("host:70000", 1883).is_err());
    }
}
