//! # hpapower-adapter-gpio-sysfs
//!
//! Drives the power line through the Linux sysfs GPIO interface.
//!
//! ## Behaviour
//!
//! | Primitive | Files touched |
//! |-----------|---------------|
//! | `initialize` | `<root>/export` (unless `<root>/gpio<N>` exists), then `<root>/gpio<N>/direction` |
//! | `set_level` | `<root>/gpio<N>/value` |
//!
//! The direction is written as `low` (or `high` for an active-low line) so
//! the pin becomes an output already at the de-energized level, with no
//! glitch through the energized level.
//!
//! ## Dependency rule
//!
//! Depends on `hpapower-app` (port traits) and `hpapower-domain` only.

mod config;
mod error;

use std::fs;
use std::path::PathBuf;

use hpapower_app::ports::ActuatorDriver;
use hpapower_domain::error::ActuatorError;

pub use config::SysfsConfig;
pub use error::SysfsError;

/// Actuator driver writing to `/sys/class/gpio`.
#[derive(Debug)]
pub struct SysfsGpio {
    config: SysfsConfig,
    initialized: bool,
}

impl SysfsGpio {
    /// Create a driver for the configured pin. Nothing is touched until
    /// [`initialize`](ActuatorDriver::initialize).
    #[must_use]
    pub fn new(config: SysfsConfig) -> Self {
        Self {
            config,
            initialized: false,
        }
    }

    fn pin_dir(&self) -> PathBuf {
        self.config.root.join(format!("gpio{}", self.config.pin))
    }
}

impl ActuatorDriver for SysfsGpio {
    #[tracing::instrument(skip(self), fields(pin = self.config.pin))]
    fn initialize(&mut self) -> Result<(), ActuatorError> {
        let pin = self.config.pin;
        let pin_dir = self.pin_dir();

        if pin_dir.exists() {
            tracing::debug!("GPIO already exported");
        } else {
            fs::write(self.config.root.join("export"), pin.to_string())
                .map_err(|source| SysfsError::Export { pin, source })?;
            tracing::debug!("GPIO exported");
        }

        let direction = if self.config.active_low { "high" } else { "low" };
        fs::write(pin_dir.join("direction"), direction)
            .map_err(|source| SysfsError::Direction { pin, source })?;

        self.initialized = true;
        tracing::info!(direction, "GPIO configured as output");
        Ok(())
    }

    fn set_level(&mut self, energized: bool) -> Result<(), ActuatorError> {
        if !self.initialized {
            return Err(ActuatorError::NotInitialized);
        }
        let pin = self.config.pin;
        let high = energized != self.config.active_low;
        fs::write(self.pin_dir().join("value"), if high { "1" } else { "0" })
            .map_err(|source| SysfsError::Value { pin, source })?;
        tracing::debug!(pin, energized, high, "GPIO level written");
        Ok(())
    }
}
