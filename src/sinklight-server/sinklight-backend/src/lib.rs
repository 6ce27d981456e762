// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::collections::HashMap;
use std::path::PathBuf;

use sinklight_core::hw::{ControlLine, Sensor};
use sinklight_core::DynResult;

mod dummy;
#[cfg(all(unix, feature = "sysfs"))]
mod sysfs;

pub use dummy::DummyRelay;
#[cfg(all(unix, feature = "sysfs"))]
pub use sysfs::{SysfsControlLine, SysfsGpio, SysfsSensor};

pub const DEFAULT_STATE_PIN: u32 = 22;
pub const DEFAULT_CTRL_PIN: u32 = 23;
pub const DEFAULT_SYSFS_ROOT: &str = "/sys/class/gpio";

/// Pin assignment and access details for a light backend.
#[derive(Debug, Clone)]
pub struct GpioAccess {
    pub state_pin: u32,
    pub ctrl_pin: u32,
    pub sysfs_root: PathBuf,
    /// Invert the sensed level (relay contact wired to ground).
    pub active_low: bool,
}

impl Default for GpioAccess {
    fn default() -> Self {
        Self {
            state_pin: DEFAULT_STATE_PIN,
            ctrl_pin: DEFAULT_CTRL_PIN,
            sysfs_root: PathBuf::from(DEFAULT_SYSFS_ROOT),
            active_low: false,
        }
    }
}

/// Sensor and control line produced by a backend.
pub struct LightHardware {
    pub sensor: Box<dyn Sensor>,
    pub line: Box<dyn ControlLine>,
}

pub type BackendFactory = fn(&GpioAccess) -> DynResult<LightHardware>;

/// Context for registering and instantiating light backends.
#[derive(Clone)]
pub struct RegistrationContext {
    factories: HashMap<String, BackendFactory>,
}

impl RegistrationContext {
    /// Create a new empty registration context.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a backend factory under a stable name (e.g. "sysfs").
    pub fn register_backend(&mut self, name: &str, factory: BackendFactory) {
        let key = normalize_name(name);
        self.factories.insert(key, factory);
    }

    /// Check whether a backend name is registered.
    pub fn is_backend_registered(&self, name: &str) -> bool {
        let key = normalize_name(name);
        self.factories.contains_key(&key)
    }

    /// List registered backend names.
    pub fn registered_backends(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Bring up the hardware for the selected backend.
    pub fn build_hardware(&self, name: &str, access: &GpioAccess) -> DynResult<LightHardware> {
        let key = normalize_name(name);
        let factory = self
            .factories
            .get(&key)
            .ok_or_else(|| format!("Unknown light backend: {}", name))?;
        factory(access)
    }
}

impl Default for RegistrationContext {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_name(name: &str) -> String {
    name.to_ascii_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Register all built-in backends enabled by features on a context.
pub fn register_builtin_backends_on(context: &mut RegistrationContext) {
    context.register_backend("dummy", dummy_factory);
    #[cfg(all(unix, feature = "sysfs"))]
    context.register_backend("sysfs", sysfs_factory);
}

fn dummy_factory(access: &GpioAccess) -> DynResult<LightHardware> {
    let relay = DummyRelay::new(access.state_pin, access.ctrl_pin);
    Ok(LightHardware {
        sensor: Box::new(relay.sensor()),
        line: Box::new(relay.line()),
    })
}

#[cfg(all(unix, feature = "sysfs"))]
fn sysfs_factory(access: &GpioAccess) -> DynResult<LightHardware> {
    let gpio = SysfsGpio::new(&access.sysfs_root);
    let sensor = SysfsSensor::open(gpio.clone(), access.state_pin, access.active_low)?;
    let line = SysfsControlLine::open(gpio, access.ctrl_pin)?;
    Ok(LightHardware {
        sensor: Box::new(sensor),
        line: Box::new(line),
    })
}
