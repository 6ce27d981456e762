// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Linux sysfs GPIO backend.
//!
//! Pins are exported under `/sys/class/gpio` and driven through their
//! `direction`/`value` attributes. Edge interrupts arrive as `POLLPRI` on the
//! value file, which a dedicated thread waits on and forwards to the
//! controller's edge queue.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use sinklight_core::error::{ActuatorError, SensorError};
use sinklight_core::hw::{ControlLine, EdgeNotifier, LineDirection, Sensor};
use sinklight_core::SensedState;
use tracing::{debug, error, info, warn};

const EXPORT_WAIT_TRIES: u32 = 10;
const EXPORT_WAIT_STEP: Duration = Duration::from_millis(50);
const POLL_TIMEOUT_MS: libc::c_int = 250;

/// Handle on a sysfs GPIO class directory.
#[derive(Debug, Clone)]
pub struct SysfsGpio {
    root: PathBuf,
}

impl SysfsGpio {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn pin_dir(&self, pin: u32) -> PathBuf {
        self.root.join(format!("gpio{}", pin))
    }

    pub fn attr_path(&self, pin: u32, attr: &str) -> PathBuf {
        self.pin_dir(pin).join(attr)
    }

    /// Export a pin, tolerating one that is already exported.
    pub fn export(&self, pin: u32) -> io::Result<()> {
        if self.pin_dir(pin).exists() {
            return Ok(());
        }
        match fs::write(self.root.join("export"), pin.to_string()) {
            Ok(()) => {}
            Err(e) if e.raw_os_error() == Some(libc::EBUSY) => {}
            Err(e) => return Err(e),
        }
        // udev may still be fixing up attribute ownership
        for _ in 0..EXPORT_WAIT_TRIES {
            if self.attr_path(pin, "value").exists() {
                debug!("Exported gpio{}", pin);
                return Ok(());
            }
            thread::sleep(EXPORT_WAIT_STEP);
        }
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("gpio{} did not appear after export", pin),
        ))
    }

    pub fn write_attr(&self, pin: u32, attr: &str, value: &str) -> io::Result<()> {
        fs::write(self.attr_path(pin, attr), value)
    }

    pub fn read_value(&self, pin: u32) -> io::Result<bool> {
        let raw = fs::read_to_string(self.attr_path(pin, "value"))?;
        parse_level(raw.trim())
    }
}

fn parse_level(raw: &str) -> io::Result<bool> {
    match raw {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unexpected gpio value '{}'", other),
        )),
    }
}

struct EdgePoller {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Drop for EdgePoller {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// State input on a sysfs GPIO pin.
pub struct SysfsSensor {
    gpio: SysfsGpio,
    pin: u32,
    last_level: AtomicBool,
    read_failures: AtomicU32,
    poller: Option<EdgePoller>,
}

impl SysfsSensor {
    /// Export the pin and configure it as an input.
    pub fn open(gpio: SysfsGpio, pin: u32, active_low: bool) -> Result<Self, SensorError> {
        let configure = |e: io::Error| SensorError::Configure {
            pin,
            reason: e.to_string(),
        };
        gpio.export(pin).map_err(configure)?;
        gpio.write_attr(pin, "direction", "in").map_err(configure)?;
        gpio.write_attr(pin, "active_low", if active_low { "1" } else { "0" })
            .map_err(configure)?;
        let level = gpio.read_value(pin).map_err(|e| SensorError::Read {
            pin,
            reason: e.to_string(),
        })?;
        info!("State input gpio{} ready, level {}", pin, u8::from(level));

        Ok(Self {
            gpio,
            pin,
            last_level: AtomicBool::new(level),
            read_failures: AtomicU32::new(0),
            poller: None,
        })
    }

    /// Reads failed in a row since the last good one.
    #[cfg(test)]
    fn consecutive_read_failures(&self) -> u32 {
        self.read_failures.load(Ordering::Relaxed)
    }
}

impl Sensor for SysfsSensor {
    fn read(&self) -> SensedState {
        match self.gpio.read_value(self.pin) {
            Ok(level) => {
                self.last_level.store(level, Ordering::Relaxed);
                let failed = self.read_failures.swap(0, Ordering::Relaxed);
                if failed > 0 {
                    info!("gpio{} readable again after {} failed read(s)", self.pin, failed);
                }
                SensedState::from_level(level)
            }
            Err(e) => {
                // Sensor::read cannot fail, so the last good level stands in
                let level = self.last_level.load(Ordering::Relaxed);
                let failed = self.read_failures.fetch_add(1, Ordering::Relaxed) + 1;
                if failed == 1 {
                    error!(
                        "Failed to read gpio{}, reporting last level {} until it recovers: {}",
                        self.pin,
                        u8::from(level),
                        e
                    );
                } else {
                    debug!("gpio{} read failure #{}: {}", self.pin, failed, e);
                }
                SensedState::from_level(level)
            }
        }
    }

    fn on_change(&mut self, notifier: EdgeNotifier) -> Result<(), SensorError> {
        if self.poller.is_some() {
            return Err(SensorError::AlreadyRegistered { pin: self.pin });
        }
        let pin = self.pin;
        let configure = |e: io::Error| SensorError::Configure {
            pin,
            reason: e.to_string(),
        };
        self.gpio
            .write_attr(pin, "edge", "both")
            .map_err(configure)?;
        let file = File::open(self.gpio.attr_path(pin, "value")).map_err(configure)?;

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name(format!("gpio{}-edges", pin))
            .spawn(move || poll_edges(file, pin, notifier, thread_stop))
            .map_err(configure)?;

        self.poller = Some(EdgePoller {
            stop,
            handle: Some(handle),
        });
        debug!("Edge interrupts enabled on gpio{}", pin);
        Ok(())
    }
}

fn poll_edges(mut file: File, pin: u32, notifier: EdgeNotifier, stop: Arc<AtomicBool>) {
    let mut buf = [0u8; 8];
    // Consume the pending value so the first poll waits for a real edge
    let _ = file.read(&mut buf);

    while !stop.load(Ordering::Relaxed) {
        let mut fds = libc::pollfd {
            fd: file.as_raw_fd(),
            events: libc::POLLPRI | libc::POLLERR,
            revents: 0,
        };
        // SAFETY: `fds` is a valid pollfd for the duration of the call and
        // the descriptor stays open while `file` is alive.
        let rc = unsafe { libc::poll(&mut fds, 1, POLL_TIMEOUT_MS) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            warn!("poll on gpio{} failed, edge reporting stopped: {}", pin, err);
            break;
        }
        if rc == 0 || fds.revents & libc::POLLPRI == 0 {
            continue;
        }

        if let Err(e) = file
            .seek(SeekFrom::Start(0))
            .and_then(|_| file.read(&mut buf))
        {
            warn!("Failed to re-arm gpio{} edge: {}", pin, e);
        }
        notifier.notify();
    }
    debug!("Edge poller for gpio{} exiting", pin);
}

/// Control line on a sysfs GPIO pin. Left as a floating input while idle.
pub struct SysfsControlLine {
    gpio: SysfsGpio,
    pin: u32,
}

impl SysfsControlLine {
    pub fn open(gpio: SysfsGpio, pin: u32) -> Result<Self, ActuatorError> {
        let direction_err = |e: io::Error| ActuatorError::Direction {
            pin,
            direction: LineDirection::Input.as_str(),
            reason: e.to_string(),
        };
        gpio.export(pin).map_err(direction_err)?;
        let mut line = Self { gpio, pin };
        line.set_direction(LineDirection::Input)?;
        info!("Control line gpio{} ready", pin);
        Ok(line)
    }
}

impl ControlLine for SysfsControlLine {
    fn pin(&self) -> u32 {
        self.pin
    }

    fn set_direction(&mut self, direction: LineDirection) -> Result<(), ActuatorError> {
        let value = match direction {
            LineDirection::Input => "in",
            LineDirection::Output => "out",
        };
        self.gpio
            .write_attr(self.pin, "direction", value)
            .map_err(|e| ActuatorError::Direction {
                pin: self.pin,
                direction: direction.as_str(),
                reason: e.to_string(),
            })
    }

    fn set_level(&mut self, high: bool) -> Result<(), ActuatorError> {
        self.gpio
            .write_attr(self.pin, "value", if high { "1" } else { "0" })
            .map_err(|e| ActuatorError::Level {
                pin: self.pin,
                level: if high { "high" } else { "low" },
                reason: e.to_string(),
            })
    }
}
