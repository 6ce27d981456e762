// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Parse a configured log level, falling back to INFO.
pub fn parse_level(log_level: Option<&str>) -> Level {
    log_level
        .and_then(|s| s.parse::<Level>().ok())
        .unwrap_or(Level::INFO)
}

/// Install the global fmt subscriber.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_logging(log_level: Option<&str>) {
    let level = parse_level(log_level);
    let _ = FmtSubscriber::builder()
        .with_target(false)
        .with_max_level(level)
        .try_init();
}
